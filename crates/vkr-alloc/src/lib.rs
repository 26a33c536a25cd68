//! Arena allocator family: bump/commit region memory, a uniform allocator
//! interface over arena-or-platform-heap, and RAII scopes that snapshot and
//! restore an arena's high-water mark.

mod allocator;
mod arena;
pub mod tag;

pub use allocator::{Allocator, AllocatorKind, AllocatorScope};
pub use arena::{natural_alignment, Arena, ArenaFlags, ArenaScope};
pub use tag::{AllocStats, Tag, TagStats};
