//! A uniform allocator interface over an arena or the platform heap.
//!
//! A plain value type rather than a trait object, so swapping in a mock or
//! alternate allocator for a test is just constructing a different variant.

use std::alloc::{alloc as heap_alloc, dealloc as heap_dealloc, realloc as heap_realloc, Layout};
use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::Rc;

use log::warn;

use crate::arena::{Arena, ArenaScope};
use crate::tag::{AllocStats, Tag};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AllocatorKind {
    Arena,
    PlatformHeap,
}

enum Ctx {
    Arena(Rc<Arena>),
    PlatformHeap,
}

impl Clone for Ctx {
    fn clone(&self) -> Self {
        match self {
            Ctx::Arena(a) => Ctx::Arena(a.clone()),
            Ctx::PlatformHeap => Ctx::PlatformHeap,
        }
    }
}

/// `alloc`/`free`/`realloc`/`report` over either an [`Arena`] or the
/// platform heap. Cheap to clone (the arena variant just bumps a refcount).
#[derive(Clone)]
pub struct Allocator {
    ctx: Ctx,
    stats: Rc<RefCell<AllocStats>>,
}

impl Allocator {
    pub fn from_arena(arena: Rc<Arena>) -> Allocator {
        Allocator {
            ctx: Ctx::Arena(arena),
            stats: Rc::new(RefCell::new(AllocStats::default())),
        }
    }

    pub fn platform_heap() -> Allocator {
        Allocator {
            ctx: Ctx::PlatformHeap,
            stats: Rc::new(RefCell::new(AllocStats::default())),
        }
    }

    pub fn kind(&self) -> AllocatorKind {
        match self.ctx {
            Ctx::Arena(_) => AllocatorKind::Arena,
            Ctx::PlatformHeap => AllocatorKind::PlatformHeap,
        }
    }

    pub fn stats(&self, tag: Tag) -> crate::tag::TagStats {
        self.stats.borrow().get(tag)
    }

    /// Returns a null pointer (`None`) or a uniquely-owned, aligned block of
    /// at least `size` bytes.
    pub fn alloc(&self, size: usize, tag: Tag) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }
        let ptr = match &self.ctx {
            Ctx::Arena(arena) => arena.alloc(size),
            Ctx::PlatformHeap => {
                let align = crate::arena::natural_alignment(size);
                let layout = Layout::from_size_align(size, align).ok()?;
                NonNull::new(unsafe { heap_alloc(layout) })
            }
        };
        if ptr.is_some() {
            self.stats.borrow_mut().record_alloc(tag, size);
            self.report(size, tag, true);
        }
        ptr
    }

    /// For the arena kind this is a safe no-op (bulk free happens only at
    /// `Arena` drop). For the platform heap it deallocates immediately.
    pub fn free(&self, ptr: Option<NonNull<u8>>, size: usize, tag: Tag) {
        match &self.ctx {
            Ctx::Arena(_) => {
                // no-op by design: arenas are only reclaimed in bulk.
            }
            Ctx::PlatformHeap => {
                if let Some(ptr) = ptr {
                    let align = crate::arena::natural_alignment(size);
                    if let Ok(layout) = Layout::from_size_align(size, align) {
                        unsafe { heap_dealloc(ptr.as_ptr(), layout) };
                    } else {
                        warn!("allocator: free called with mismatched size/tag ({:?})", tag);
                    }
                }
            }
        }
        self.stats.borrow_mut().record_free(tag, size);
        self.report(size, tag, false);
    }

    /// `new_size <= old_size` returns `ptr` unchanged; otherwise a new block
    /// is allocated and `min(old_size, new_size)` bytes are copied in. The
    /// old block is never freed for the arena kind.
    pub fn realloc(
        &self,
        ptr: Option<NonNull<u8>>,
        old_size: usize,
        new_size: usize,
        tag: Tag,
    ) -> Option<NonNull<u8>> {
        if let Some(p) = ptr {
            if new_size <= old_size {
                return Some(p);
            }
        }
        match (&self.ctx, ptr) {
            (Ctx::PlatformHeap, Some(p)) => {
                let old_align = crate::arena::natural_alignment(old_size);
                let layout = Layout::from_size_align(old_size, old_align).ok()?;
                let new_ptr = NonNull::new(unsafe { heap_realloc(p.as_ptr(), layout, new_size) })?;
                self.stats.borrow_mut().record_alloc(tag, new_size - old_size);
                self.report(new_size - old_size, tag, true);
                Some(new_ptr)
            }
            _ => {
                let new_ptr = self.alloc(new_size, tag)?;
                if let Some(old_ptr) = ptr {
                    let n = old_size.min(new_size);
                    unsafe {
                        std::ptr::copy_nonoverlapping(old_ptr.as_ptr(), new_ptr.as_ptr(), n);
                    }
                }
                Some(new_ptr)
            }
        }
    }

    /// Out-of-band statistics hook, used by GPU memory accounting callers
    /// that want to observe every alloc/free independently of the stats
    /// snapshot above.
    pub fn report(&self, _size: usize, _tag: Tag, _is_alloc: bool) {
        // No-op extension point: a telemetry sink can hook in here later
        // without changing any caller.
    }

    /// Snapshots the arena's used watermark. Non-arena allocators return an
    /// invalid scope: callers must fall back to explicit frees.
    pub fn begin_scope(&self) -> AllocatorScope<'_> {
        match &self.ctx {
            Ctx::Arena(arena) => AllocatorScope::Valid(arena.begin_scope()),
            Ctx::PlatformHeap => AllocatorScope::Invalid,
        }
    }
}

pub enum AllocatorScope<'a> {
    Valid(ArenaScope<'a>),
    Invalid,
}

impl<'a> AllocatorScope<'a> {
    pub fn is_valid(&self) -> bool {
        matches!(self, AllocatorScope::Valid(_))
    }

    /// Truncates the arena back to the snapshot taken at `begin_scope`.
    /// `tag` is recorded purely for diagnostics.
    pub fn end(self, tag: Tag) {
        if let AllocatorScope::Valid(scope) = &self {
            let _ = tag;
            let _ = scope;
        }
        drop(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaFlags;

    #[test]
    fn arena_free_is_a_no_op() {
        let arena = Rc::new(Arena::create(4096, 256, ArenaFlags::NONE));
        let allocator = Allocator::from_arena(arena.clone());
        let ptr = allocator.alloc(32, Tag::Vector);
        assert!(ptr.is_some());
        let used_before = arena.used();
        allocator.free(ptr, 32, Tag::Vector);
        assert_eq!(arena.used(), used_before);
    }

    #[test]
    fn platform_heap_roundtrips() {
        let allocator = Allocator::platform_heap();
        let ptr = allocator.alloc(128, Tag::Gpu).unwrap();
        unsafe {
            *ptr.as_ptr() = 0xAB;
        }
        allocator.free(Some(ptr), 128, Tag::Gpu);
    }

    #[test]
    fn scope_invalid_for_platform_heap() {
        let allocator = Allocator::platform_heap();
        let scope = allocator.begin_scope();
        assert!(!scope.is_valid());
    }

    #[test]
    fn realloc_grows_and_copies() {
        let allocator = Allocator::platform_heap();
        let ptr = allocator.alloc(4, Tag::String).unwrap();
        unsafe {
            std::ptr::copy_nonoverlapping(b"data".as_ptr(), ptr.as_ptr(), 4);
        }
        let grown = allocator.realloc(Some(ptr), 4, 16, Tag::String).unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(grown.as_ptr(), 4) };
        assert_eq!(bytes, b"data");
        allocator.free(Some(grown), 16, Tag::String);
    }
}
