use std::{
    alloc::{self, Layout},
    fmt,
    marker::PhantomData,
    mem,
    ptr::{self, NonNull},
};

use crate::{
    memory::{is_trivial, ArrayResource, Resource},
    Error, Result,
};

const OUT_OF_MEMORY: Error = Error::FailedAlloc("Out of memory");
const CAPACITY_OVERFLOW: Error = Error::FailedAlloc("Capacity overflow");

pub(crate) fn raw_alloc(layout: Layout) -> Result<NonNull<u8>> {
    if layout.size() == 0 {
        // A non-null address equal to the alignment is a valid dangling
        // pointer for this layout.
        return NonNull::new(layout.align() as *mut u8).ok_or(OUT_OF_MEMORY);
    }
    // SAFETY: `layout` has a non-zero size.
    let ptr = unsafe { alloc::alloc(layout) };
    NonNull::new(ptr).ok_or(OUT_OF_MEMORY)
}

/// # Safety
/// `ptr` must have come from `raw_alloc(layout)`.
pub(crate) unsafe fn raw_free(ptr: NonNull<u8>, layout: Layout) {
    if layout.size() != 0 {
        // SAFETY: non-empty blocks were obtained from the global allocator
        // with this exact layout.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

fn array_layout<T>(len: usize) -> Result<Layout> {
    Layout::array::<T>(len).map_err(|_| CAPACITY_OVERFLOW)
}

pub(crate) fn array_alloc<T>(len: usize) -> Result<NonNull<T>> {
    if len == 0 || mem::size_of::<T>() == 0 {
        return Ok(NonNull::dangling());
    }
    let layout = array_layout::<T>(len)?;
    // SAFETY: `len > 0` and `T` is not zero-sized, so the layout is non-empty.
    let ptr = unsafe { alloc::alloc(layout) } as *mut T;
    NonNull::new(ptr).ok_or(OUT_OF_MEMORY)
}

/// # Safety
/// * `ptr` must have come from `array_alloc::<T>(old_len)` or
///   `array_realloc` with resulting capacity `old_len`.
/// * Slots `new_len..old_len` must hold no live value.
pub(crate) unsafe fn array_realloc<T>(
    ptr: NonNull<T>,
    old_len: usize,
    new_len: usize,
) -> Result<NonNull<T>> {
    if mem::size_of::<T>() == 0 {
        return Ok(NonNull::dangling());
    }
    if old_len == 0 {
        return array_alloc(new_len);
    }
    if new_len == 0 {
        // SAFETY: forwarded from the caller.
        unsafe { array_free(ptr, old_len) };
        return Ok(NonNull::dangling());
    }

    let old_layout = array_layout::<T>(old_len)?;
    let new_layout = array_layout::<T>(new_len)?;

    if is_trivial::<T>() {
        // SAFETY: `ptr` was allocated with `old_layout`, the new size is
        // non-zero and does not overflow `isize` (checked by `Layout::array`).
        let new = unsafe { alloc::realloc(ptr.as_ptr() as *mut u8, old_layout, new_layout.size()) };
        return NonNull::new(new as *mut T).ok_or(OUT_OF_MEMORY);
    }

    let new = array_alloc::<T>(new_len)?;
    // SAFETY: both blocks are valid for `min(old_len, new_len)` elements and
    // are distinct allocations. Moving bitwise leaves the old slots logically
    // uninitialized, so they are freed without dropping.
    unsafe {
        ptr::copy_nonoverlapping(ptr.as_ptr(), new.as_ptr(), old_len.min(new_len));
        array_free(ptr, old_len);
    }
    Ok(new)
}

/// # Safety
/// `ptr` must have come from `array_alloc::<T>(len)` (or a realloc that
/// produced capacity `len`).
pub(crate) unsafe fn array_free<T>(ptr: NonNull<T>, len: usize) {
    if len == 0 || mem::size_of::<T>() == 0 {
        return;
    }
    if let Ok(layout) = Layout::array::<T>(len) {
        // SAFETY: the block was allocated with this layout.
        unsafe { alloc::dealloc(ptr.as_ptr() as *mut u8, layout) }
    }
}

/// Drops the live elements in slots `from..to`.
///
/// # Safety
/// Every slot in `from..to` must hold a live `T`.
pub(crate) unsafe fn drop_range<T>(ptr: NonNull<T>, from: usize, to: usize) {
    if is_trivial::<T>() || from >= to {
        return;
    }
    // SAFETY: forwarded from the caller.
    unsafe {
        let first = ptr.as_ptr().add(from);
        ptr::drop_in_place(ptr::slice_from_raw_parts_mut(first, to - from));
    }
}

/// The default scalar resource: one global-allocator block per object.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SystemResource;

impl<T> Resource<T> for SystemResource {
    fn allocate(&self, value: T) -> Result<NonNull<T>> {
        let ptr = if mem::size_of::<T>() == 0 {
            NonNull::dangling()
        } else {
            let layout = Layout::new::<T>();
            // SAFETY: `T` is not zero-sized.
            let raw = unsafe { alloc::alloc(layout) } as *mut T;
            NonNull::new(raw).ok_or(OUT_OF_MEMORY)?
        };
        // SAFETY: `ptr` is valid for writes of one `T` and properly aligned.
        unsafe { ptr.as_ptr().write(value) };
        Ok(ptr)
    }

    unsafe fn deallocate_with<const CALL_DROP: bool>(&self, ptr: NonNull<T>) {
        if CALL_DROP {
            // SAFETY: the caller guarantees the pointee is live.
            unsafe { ptr::drop_in_place(ptr.as_ptr()) };
        }
        if mem::size_of::<T>() != 0 {
            // SAFETY: `ptr` came from `allocate`, which used `Layout::new::<T>()`.
            unsafe { alloc::dealloc(ptr.as_ptr() as *mut u8, Layout::new::<T>()) };
        }
    }
}

/// The default array resource: contiguous blocks from the global allocator.
///
/// Types without drop glue are resized with `realloc`; everything else is
/// moved into a fresh block.
pub struct SystemArrayResource<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SystemArrayResource<T> {
    pub const fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> ArrayResource<T> for SystemArrayResource<T> {
    fn allocate(&self, len: usize) -> Result<NonNull<T>> {
        array_alloc(len)
    }

    unsafe fn reallocate(&self, ptr: NonNull<T>, old_len: usize, new_len: usize) -> Result<NonNull<T>> {
        // SAFETY: forwarded from the caller.
        unsafe { array_realloc(ptr, old_len, new_len) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<T>, len: usize) {
        // SAFETY: forwarded from the caller.
        unsafe { array_free(ptr, len) }
    }
}

impl<T> Default for SystemArrayResource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SystemArrayResource<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SystemArrayResource<T> {}

impl<T> fmt::Debug for SystemArrayResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SystemArrayResource")
    }
}
