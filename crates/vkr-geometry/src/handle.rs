//! Handle + generation pattern: a typed `{id, generation}` pair rather than
//! a raw index. `id == 0` is the null handle; a handle is live iff the
//! slot's generation still matches.

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GeometryHandle {
    pub id: u32,
    pub generation: u32,
}

impl GeometryHandle {
    pub const NULL: GeometryHandle = GeometryHandle { id: 0, generation: 0 };

    pub fn is_null(self) -> bool {
        self.id == 0
    }

    /// Index into the entry slot array; only meaningful when `!is_null()`.
    pub(crate) fn slot_index(self) -> usize {
        debug_assert!(!self.is_null());
        (self.id - 1) as usize
    }
}
