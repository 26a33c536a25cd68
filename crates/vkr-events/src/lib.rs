//! Event-data ring buffer (component C) and threaded event manager
//! (component D): the producer/consumer dispatch layer over the arena and
//! allocator in `vkr-alloc`.

pub mod buffer;
pub mod manager;

pub use buffer::EventDataBuffer;
pub use manager::{Event, EventCallback, EventManager};
