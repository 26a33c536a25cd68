//! `name → slot_index`. A pipeline can be reachable under more than one
//! name: the name it was registered with, and a domain alias (`p_<domain>`)
//! used by [`crate::registry::PipelineRegistry::get_pipeline_for_material`]'s
//! fallback. Both kinds of entry are plain `name -> slot_index` rows in the
//! same table; nothing here distinguishes "primary" from "alias" once
//! inserted.
//!
//! Names are interned into a dedicated arena owned by the registry so the
//! table can hold a `&CStr` instead of copying a `String` per entry.

use std::ffi::CStr;
use std::rc::Rc;

use vkr_alloc::Arena;
use vkr_collections::HashTable;
use vkr_config::HashTableConfig;

fn intern(arena: &Arena, s: &str) -> &'static CStr {
    let mut bytes = Vec::with_capacity(s.len() + 1);
    bytes.extend_from_slice(s.as_bytes());
    bytes.push(0);
    let ptr = arena
        .alloc(bytes.len())
        .expect("pipeline name arena exhausted interning a name");
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
        CStr::from_ptr(ptr.as_ptr() as *const i8)
    }
}

pub struct NameMap {
    arena: Rc<Arena>,
    table: HashTable<'static, usize>,
}

impl NameMap {
    pub fn new(arena: Rc<Arena>, config: HashTableConfig) -> NameMap {
        NameMap {
            arena,
            table: HashTable::with_capacity(config.initial_capacity),
        }
    }

    pub fn insert(&mut self, name: &str, slot_index: usize) {
        let key = intern(&self.arena, name);
        self.table.insert(key, slot_index);
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        let c = std::ffi::CString::new(name).ok()?;
        self.table.get(c.as_c_str()).copied()
    }

    pub fn remove(&mut self, name: &str) -> Option<usize> {
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
