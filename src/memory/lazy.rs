use std::{collections::HashSet, fmt, mem, ptr::NonNull};

use tracing::{error, trace};

use crate::{memory::Page, trace_verbose, Error, List, Result, Vector};

/// A bump allocator over fixed pages of `PAGE` slots, with a LIFO free list
/// for reusing released slots.
///
/// Pages are only ever appended. Memory goes back to the system when the
/// allocator is dropped, or earlier through [`LazyAllocator::trim`] once
/// nothing is live.
///
/// With `CALL_DROPS` set, objects still live when the allocator is dropped
/// are dropped with it.
///
/// # Examples
///
/// ```
/// # use pmr_kit::memory::LazyAllocator;
/// # use assert2::assert;
/// let mut alloc: LazyAllocator<u64, 2> = LazyAllocator::new();
/// let a = alloc.alloc(1).unwrap();
/// let _b = alloc.alloc(2).unwrap();
/// unsafe { alloc.dealloc(a).unwrap() };
/// let c = alloc.alloc(3).unwrap();
/// assert!(c == a);
/// assert!(alloc.page_count() == 1);
/// ```
pub struct LazyAllocator<T, const PAGE: usize = 256, const CALL_DROPS: bool = true> {
    pages: List<Page<T, PAGE, false>>,
    free_list: Vector<NonNull<T>>,
    live: usize,
}

impl<T, const PAGE: usize, const CALL_DROPS: bool> LazyAllocator<T, PAGE, CALL_DROPS> {
    const VALID_PAGE: () = assert!(PAGE > 0, "pages must hold at least one object");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_PAGE;
        Self {
            pages: List::new(),
            free_list: Vector::new(),
            live: 0,
        }
    }

    /// Moves `value` into a slot, preferring the most recently released one.
    pub fn alloc(&mut self, value: T) -> Result<NonNull<T>> {
        if !self.free_list.is_empty() {
            let slot = self.free_list.pop_back_move()?;
            // SAFETY: free-list slots belong to a live page and their previous
            // occupant was dropped by `dealloc`.
            unsafe { slot.as_ptr().write(value) };
            self.live += 1;
            trace_verbose!(live = self.live, "reused free-list slot");
            return Ok(slot);
        }

        let needs_page = self.pages.back().map_or(true, Page::is_full);
        if needs_page {
            // Keep room for every slot on the free list so releasing never
            // has to allocate.
            self.free_list.reserve((self.pages.len() + 1) * PAGE)?;
            self.pages.push_back(Page::new()?)?;
            trace!(pages = self.pages.len(), page_capacity = PAGE, "lazy allocator added page");
        }
        let slot = self.pages.back_mut()?.alloc(value)?;
        self.live += 1;
        Ok(slot)
    }

    /// Drops the object at `ptr` and keeps its slot for reuse.
    ///
    /// # Errors
    /// [`Error::InvalidOperation`] if nothing is live. The object is then left
    /// untouched.
    ///
    /// # Safety
    /// `ptr` must have been returned by `alloc` on this allocator and not
    /// released since.
    pub unsafe fn dealloc(&mut self, ptr: NonNull<T>) -> Result<()> {
        // SAFETY: forwarded from the caller.
        unsafe { self.release::<true>(ptr) }
    }

    /// Like [`LazyAllocator::dealloc`] but does not drop the object, which the
    /// caller has already moved out.
    ///
    /// # Safety
    /// As for `dealloc`, and the pointee must no longer be considered live.
    pub unsafe fn forget(&mut self, ptr: NonNull<T>) -> Result<()> {
        // SAFETY: forwarded from the caller.
        unsafe { self.release::<false>(ptr) }
    }

    unsafe fn release<const CALL_DROP: bool>(&mut self, ptr: NonNull<T>) -> Result<()> {
        if self.live == 0 {
            error!("lazy allocator asked to release more objects than it handed out");
            return Err(Error::InvalidOperation("Deallocating more objects than allocated"));
        }
        debug_assert!(self.owns(ptr), "pointer was not handed out by this allocator");
        self.free_list.push_back(ptr)?;
        self.live -= 1;
        if CALL_DROP {
            // SAFETY: the caller guarantees `ptr` is a live object from `alloc`.
            unsafe { ptr.as_ptr().drop_in_place() };
        }
        Ok(())
    }

    /// Whether `ptr` lies in a slot some page of this allocator handed out.
    pub fn owns(&self, ptr: NonNull<T>) -> bool {
        self.pages.iter().any(|page| page.contains(ptr))
    }

    /// Objects handed out and not yet released.
    pub fn live(&self) -> usize {
        self.live
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Released slots waiting for reuse.
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Returns every page to the system if no object is live. Returns whether
    /// anything was freed.
    pub fn trim(&mut self) -> bool {
        if self.live != 0 || self.pages.is_empty() {
            return false;
        }
        self.free_list.forget_elements();
        self.pages.clear();
        trace!("lazy allocator trimmed");
        true
    }

    fn drop_live_objects(&mut self) {
        if !mem::needs_drop::<T>() || self.live == 0 {
            return;
        }
        if mem::size_of::<T>() == 0 {
            for _ in 0..self.live {
                // SAFETY: zero-sized values live at the dangling address;
                // `live` of them are still owed a drop.
                unsafe { NonNull::<T>::dangling().as_ptr().drop_in_place() };
            }
            return;
        }
        let released: HashSet<*mut T> = self.free_list.iter().map(|p| p.as_ptr()).collect();
        for page in self.pages.iter() {
            for slot in page.slots() {
                if !released.contains(&slot.as_ptr()) {
                    // SAFETY: handed-out slots not on the free list are live.
                    unsafe { slot.as_ptr().drop_in_place() };
                }
            }
        }
    }
}

impl<T, const PAGE: usize, const CALL_DROPS: bool> Drop for LazyAllocator<T, PAGE, CALL_DROPS> {
    fn drop(&mut self) {
        if CALL_DROPS {
            self.drop_live_objects();
        }
        self.free_list.forget_elements();
        self.pages.clear();
    }
}

impl<T, const PAGE: usize, const CALL_DROPS: bool> Default for LazyAllocator<T, PAGE, CALL_DROPS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const PAGE: usize, const CALL_DROPS: bool> fmt::Debug for LazyAllocator<T, PAGE, CALL_DROPS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyAllocator")
            .field("pages", &self.pages.len())
            .field("free", &self.free_list.len())
            .field("live", &self.live)
            .finish()
    }
}

// SAFETY: the allocator owns its pages and every object in them; the raw
// pointers in the free list only point into those pages.
unsafe impl<T: Send, const PAGE: usize, const CALL_DROPS: bool> Send for LazyAllocator<T, PAGE, CALL_DROPS> {}
