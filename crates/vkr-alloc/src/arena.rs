//! Bump/commit region allocator.
//!
//! Allocation is append-only and free is a no-op; the only way to reclaim
//! space is to roll the `used` watermark back to an earlier position, via
//! `reset_to` or a nested `ArenaScope`. A reserve/commit/used watermark
//! triple lets the backing reservation grow its committed pages lazily
//! while keeping every handed-out pointer valid for the arena's lifetime.

use std::alloc::{alloc, dealloc, Layout};
use std::cell::Cell;
use std::ptr::NonNull;

use log::debug;

bitflags::bitflags! {
    pub struct ArenaFlags: u32 {
        const NONE = 0;
        const LARGE_PAGES = 1 << 0;
    }
}

const OS_PAGE_SIZE: usize = 4096;

/// A reserved region of memory with a commit watermark and a used watermark.
///
/// `0 <= used <= committed <= reserved` holds after every operation. The
/// backing storage is allocated once, for the full `reserved` size, so that
/// pointers handed out by `alloc` stay valid for the arena's lifetime: only
/// the logical `committed`/`used` watermarks move.
pub struct Arena {
    base: NonNull<u8>,
    layout: Layout,
    reserved: usize,
    commit_step: usize,
    committed: Cell<usize>,
    used: Cell<usize>,
    scope_depth: Cell<u32>,
    flags: ArenaFlags,
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("reserved", &self.reserved)
            .field("committed", &self.committed.get())
            .field("used", &self.used.get())
            .field("flags", &self.flags)
            .finish()
    }
}

/// Rounds an allocation request up to the natural alignment of its size
/// class: powers of two up to 16 bytes, 16 beyond that.
pub fn natural_alignment(size: usize) -> usize {
    if size == 0 {
        1
    } else {
        size.next_power_of_two().min(16)
    }
}

fn align_up(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

impl Arena {
    /// Creates an arena reserving `reserve` bytes and committing `commit`
    /// bytes up front. `reserve` is rounded up to a multiple of `commit` (or
    /// of the OS page size, whichever growth step applies).
    pub fn create(reserve: usize, commit: usize, flags: ArenaFlags) -> Arena {
        let commit_step = if flags.contains(ArenaFlags::LARGE_PAGES) {
            OS_PAGE_SIZE.max(commit)
        } else {
            commit.max(1)
        };
        let reserved = align_up(reserve.max(commit_step), commit_step);
        let layout = Layout::from_size_align(reserved, 16).expect("invalid arena layout");
        let base = unsafe { NonNull::new(alloc(layout)).expect("arena allocation failed") };
        let initial_commit = commit_step.min(reserved);
        debug!(
            "arena: reserved {} bytes, initial commit {} bytes",
            reserved, initial_commit
        );
        Arena {
            base,
            layout,
            reserved,
            commit_step,
            committed: Cell::new(initial_commit),
            used: Cell::new(0),
            scope_depth: Cell::new(0),
            flags,
        }
    }

    pub fn reserved(&self) -> usize {
        self.reserved
    }

    pub fn committed(&self) -> usize {
        self.committed.get()
    }

    pub fn used(&self) -> usize {
        self.used.get()
    }

    pub fn flags(&self) -> ArenaFlags {
        self.flags
    }

    /// Current position of the used watermark; pairs with `reset_to`.
    pub fn pos(&self) -> usize {
        self.used.get()
    }

    fn grow_commit(&self, required: usize) -> bool {
        let mut committed = self.committed.get();
        while committed < required {
            if committed >= self.reserved {
                return false;
            }
            committed = (committed + self.commit_step).min(self.reserved);
        }
        self.committed.set(committed);
        true
    }

    /// Bump-allocates `size` bytes aligned to their natural alignment.
    /// Returns `None` (never a panic or abort) when growth would cross the
    /// reserved bound.
    pub fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }
        let align = natural_alignment(size);
        let used = self.used.get();
        let start = align_up(used, align);
        let end = start.checked_add(size)?;
        if end > self.reserved {
            return None;
        }
        if end > self.committed.get() && !self.grow_commit(end) {
            return None;
        }
        self.used.set(end);
        // SAFETY: `start..end` is within `[0, reserved)`, which is the
        // single allocation backing this arena; the pointer stays valid for
        // the arena's lifetime because the backing storage never moves.
        let ptr = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(start)) };
        Some(ptr)
    }

    /// Truncates the used watermark back to `pos`. `pos` must have been
    /// produced by an earlier call to `pos()`/`alloc()` on this same arena.
    pub fn reset_to(&self, pos: usize) {
        debug_assert!(pos <= self.used.get());
        self.used.set(pos);
    }

    /// Begins a scope capturing the current used watermark.
    pub fn begin_scope(&self) -> ArenaScope<'_> {
        let depth = self.scope_depth.get();
        self.scope_depth.set(depth + 1);
        ArenaScope {
            arena: self,
            used_at_entry: self.used.get(),
            depth,
        }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe { dealloc(self.base.as_ptr(), self.layout) }
    }
}

/// A snapshot of an arena's used watermark. Truncates the arena back to that
/// mark when ended (explicitly, or implicitly on drop). Scopes must nest
/// strictly: ending a scope out of order is a programmer error caught by a
/// debug assertion.
pub struct ArenaScope<'a> {
    arena: &'a Arena,
    used_at_entry: usize,
    depth: u32,
}

impl<'a> ArenaScope<'a> {
    pub fn used_at_entry(&self) -> usize {
        self.used_at_entry
    }

    /// Ends the scope, truncating the arena. Equivalent to dropping it.
    pub fn end(self) {
        drop(self)
    }
}

impl<'a> Drop for ArenaScope<'a> {
    fn drop(&mut self) {
        debug_assert_eq!(
            self.arena.scope_depth.get(),
            self.depth + 1,
            "allocator scopes must nest strictly (LIFO)"
        );
        self.arena.reset_to(self.used_at_entry);
        self.arena.scope_depth.set(self.depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_holds_after_every_alloc() {
        let arena = Arena::create(4096, 256, ArenaFlags::NONE);
        for _ in 0..64 {
            arena.alloc(17);
            assert!(arena.used() <= arena.committed());
            assert!(arena.committed() <= arena.reserved());
        }
    }

    #[test]
    fn alloc_fails_past_reserved() {
        let arena = Arena::create(128, 64, ArenaFlags::NONE);
        assert!(arena.alloc(64).is_some());
        assert!(arena.alloc(64).is_some());
        assert!(arena.alloc(64).is_none());
    }

    #[test]
    fn scope_restores_used_watermark() {
        let arena = Arena::create(4096, 256, ArenaFlags::NONE);
        arena.alloc(32);
        let pos_before = arena.pos();
        {
            let _scope = arena.begin_scope();
            arena.alloc(64);
            arena.alloc(128);
            assert!(arena.used() > pos_before);
        }
        assert_eq!(arena.used(), pos_before);
    }

    #[test]
    fn reset_to_is_exact() {
        let arena = Arena::create(4096, 256, ArenaFlags::NONE);
        arena.alloc(16);
        let pos = arena.pos();
        arena.alloc(200);
        arena.reset_to(pos);
        assert_eq!(arena.used(), pos);
    }

    #[test]
    #[should_panic]
    fn scopes_must_nest_strictly() {
        let arena = Arena::create(4096, 256, ArenaFlags::NONE);
        let outer = arena.begin_scope();
        let inner = arena.begin_scope();
        drop(outer); // ends the outer scope while inner is still open: LIFO violation
        drop(inner);
    }
}
