//! Handle + generation pattern, mirroring the geometry system's scheme: a
//! typed `{id, generation}` pair rather than a raw index. `id == 0` is the
//! null handle; a handle is live iff the slot's generation still matches.

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PipelineHandle {
    pub id: u32,
    pub generation: u32,
}

impl PipelineHandle {
    pub const NULL: PipelineHandle = PipelineHandle { id: 0, generation: 0 };

    pub fn is_null(self) -> bool {
        self.id == 0
    }

    pub(crate) fn slot_index(self) -> usize {
        debug_assert!(!self.is_null());
        (self.id - 1) as usize
    }
}
