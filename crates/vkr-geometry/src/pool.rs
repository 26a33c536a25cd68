//! Per vertex-layout pool: a shared vertex buffer and index buffer, each
//! suballocated with its own byte-range freelist.

use vkr_backend::BufferHandle;
use vkr_collections::Freelist;

pub struct LayoutPool {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub vertex_freelist: Freelist,
    pub index_freelist: Freelist,
    pub vertex_stride: u32,
}

/// Rounds `value` up to the next multiple of `align`, where `align` is a
/// power of two.
pub fn round_up_pow2(value: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}
