use std::{fmt, ptr::NonNull};

use crate::{
    memory::system::{array_alloc, array_free, drop_range},
    trace_verbose, Error, Result,
};

/// A fixed slab of `CAP` slots for `T`, handed out front to back.
///
/// When `CALL_DROPS` is set, dropping the page drops every slot that was ever
/// handed out. Allocators that destroy objects themselves (through a free
/// list) use `CALL_DROPS = false`.
pub struct Page<T, const CAP: usize, const CALL_DROPS: bool = true> {
    slab: NonNull<T>,
    offset: usize,
}

impl<T, const CAP: usize, const CALL_DROPS: bool> Page<T, CAP, CALL_DROPS> {
    pub fn new() -> Result<Self> {
        let slab = array_alloc::<T>(CAP)?;
        Ok(Self { slab, offset: 0 })
    }

    /// Moves `value` into the next free slot.
    ///
    /// # Errors
    /// [`Error::FailedAlloc`] once all `CAP` slots have been handed out.
    pub fn alloc(&mut self, value: T) -> Result<NonNull<T>> {
        if self.is_full() {
            return Err(Error::FailedAlloc("Out of memory in lazy page allocator"));
        }
        // SAFETY: `offset < CAP`, so the slot lies inside the slab.
        let slot = unsafe { NonNull::new_unchecked(self.slab.as_ptr().add(self.offset)) };
        // SAFETY: the slot has never been handed out, so it holds no live value.
        unsafe { slot.as_ptr().write(value) };
        self.offset += 1;
        trace_verbose!(offset = self.offset, "page slot handed out");
        Ok(slot)
    }

    pub fn is_full(&self) -> bool {
        self.offset >= CAP
    }

    /// Number of slots handed out so far.
    pub fn len(&self) -> usize {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }

    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// Pointers to every slot handed out so far, in order.
    pub fn slots(&self) -> impl Iterator<Item = NonNull<T>> + '_ {
        let base = self.slab.as_ptr();
        // SAFETY: `i < offset <= CAP`, so each slot lies inside the slab.
        (0..self.offset).map(move |i| unsafe { NonNull::new_unchecked(base.add(i)) })
    }

    /// Whether `ptr` points at a slot this page has handed out.
    pub fn contains(&self, ptr: NonNull<T>) -> bool {
        let size = core::mem::size_of::<T>();
        if size == 0 {
            return self.offset > 0 && ptr == self.slab;
        }
        let start = self.slab.as_ptr() as usize;
        let addr = ptr.as_ptr() as usize;
        addr >= start && addr < start + self.offset * size && (addr - start) % size == 0
    }
}

impl<T, const CAP: usize, const CALL_DROPS: bool> Drop for Page<T, CAP, CALL_DROPS> {
    fn drop(&mut self) {
        // SAFETY: slots `0..offset` were initialized by `alloc`, and the slab
        // was obtained from `array_alloc::<T>(CAP)`.
        unsafe {
            if CALL_DROPS {
                drop_range(self.slab, 0, self.offset);
            }
            array_free(self.slab, CAP);
        }
    }
}

impl<T, const CAP: usize, const CALL_DROPS: bool> fmt::Debug for Page<T, CAP, CALL_DROPS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("offset", &self.offset)
            .field("capacity", &CAP)
            .finish()
    }
}

// SAFETY: a page uniquely owns its slab and the values in it.
unsafe impl<T: Send, const CAP: usize, const CALL_DROPS: bool> Send for Page<T, CAP, CALL_DROPS> {}
