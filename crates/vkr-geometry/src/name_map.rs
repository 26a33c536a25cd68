//! `name → {slot_index, ref_count, auto_release}`.
//!
//! Keys are interned into a dedicated arena owned by the
//! [`crate::system::GeometrySystem`] rather than borrowed from caller
//! stacks, so the table can hold a `&CStr` instead of copying a `String`
//! per entry.

use std::ffi::CStr;
use std::rc::Rc;

use vkr_alloc::Arena;
use vkr_collections::HashTable;
use vkr_config::HashTableConfig;

#[derive(Copy, Clone, Debug)]
pub struct NameMapEntry {
    pub slot_index: usize,
    pub ref_count: u32,
    pub auto_release: bool,
}

/// Bump-allocates `s` plus a NUL terminator into `arena` and hands back a
/// `'static`-lifetime view of it.
///
/// SAFETY: the arena's backing storage is a single heap allocation that
/// never moves or shrinks for the arena's lifetime (see `vkr_alloc::Arena`),
/// so a pointer into it stays valid for as long as the `Rc<Arena>` this
/// system holds is alive. The `'static` lifetime here is a lie enforced by
/// convention: every `&'static CStr` produced by this function must be
/// dropped (by clearing the name map) no later than the owning arena.
fn intern(arena: &Arena, s: &str) -> &'static CStr {
    let mut bytes = Vec::with_capacity(s.len() + 1);
    bytes.extend_from_slice(s.as_bytes());
    bytes.push(0);
    let ptr = arena
        .alloc(bytes.len())
        .expect("geometry name arena exhausted interning a name");
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
        CStr::from_ptr(ptr.as_ptr() as *const i8)
    }
}

pub struct NameMap {
    arena: Rc<Arena>,
    table: HashTable<'static, NameMapEntry>,
}

impl NameMap {
    pub fn new(arena: Rc<Arena>, config: HashTableConfig) -> NameMap {
        NameMap {
            arena,
            table: HashTable::with_capacity(config.initial_capacity),
        }
    }

    pub fn insert(&mut self, name: &str, entry: NameMapEntry) {
        let key = intern(&self.arena, name);
        self.table.insert(key, entry);
    }

    pub fn get(&self, name: &str) -> Option<&NameMapEntry> {
        let c = std::ffi::CString::new(name).ok()?;
        self.table.get(c.as_c_str())
    }

    pub fn adjust_ref_count(&mut self, name: &str, delta: i32) -> Option<u32> {
        let c = std::ffi::CString::new(name).ok()?;
        let entry = self.table.get_mut(c.as_c_str())?;
        entry.ref_count = (entry.ref_count as i32 + delta).max(0) as u32;
        Some(entry.ref_count)
    }

    pub fn remove(&mut self, name: &str) -> Option<NameMapEntry> {
        let c = std::ffi::CString::new(name).ok()?;
        self.table.remove(c.as_c_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        match std::ffi::CString::new(name) {
            Ok(c) => self.table.contains(c.as_c_str()),
            Err(_) => false,
        }
    }
}
