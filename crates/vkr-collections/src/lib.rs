//! Open-addressing hash table (component E) and coalescing byte-range
//! freelist (component F): the two suballocation primitives the geometry
//! system and pipeline registry build on.

pub mod freelist;
pub mod hashtable;

pub use freelist::{memory_requirement, Freelist};
pub use hashtable::HashTable;
