use std::{alloc::Layout, ptr::NonNull};

use crate::{memory::system, Result};

/// A provider of storage for single objects of type `T`.
///
/// `allocate` hands back a pointer to a fully initialized `T`. The pointer must
/// later be given to exactly one `deallocate` (or `deallocate_with`) call on
/// the same resource (or a clone sharing its state).
///
/// The array-flavored verbs (`arr`, `reallocate`, `raw`) have default
/// implementations backed by the global allocator. Resources that manage
/// single-object slabs (see [`MonotonicResource`](crate::memory::MonotonicResource))
/// keep those defaults.
pub trait Resource<T> {
    /// Moves `value` into storage obtained from this resource.
    fn allocate(&self, value: T) -> Result<NonNull<T>>;

    /// Returns `ptr` to the resource. When `CALL_DROP` is `true` the pointee is
    /// dropped first, otherwise the caller has already moved it out.
    ///
    /// # Safety
    /// * `ptr` must have come from `allocate` on this resource and must not
    ///   have been deallocated since.
    /// * If `CALL_DROP` is `false` the pointee must already be logically
    ///   moved out or dropped.
    unsafe fn deallocate_with<const CALL_DROP: bool>(&self, ptr: NonNull<T>);

    /// Drops the pointee and returns its storage.
    ///
    /// # Safety
    /// Same as [`Resource::deallocate_with`].
    unsafe fn deallocate(&self, ptr: NonNull<T>) {
        // SAFETY: forwarded from the caller.
        unsafe { self.deallocate_with::<true>(ptr) }
    }

    /// Untyped storage for `layout`.
    fn raw(&self, layout: Layout) -> Result<NonNull<u8>> {
        system::raw_alloc(layout)
    }

    /// Uninitialized storage for `len` values of `T`.
    fn arr(&self, len: usize) -> Result<NonNull<T>> {
        system::array_alloc(len)
    }

    /// Resizes an array of `old_len` *live* elements obtained from `arr`.
    ///
    /// The first `min(old_len, new_len)` elements are preserved, the rest are
    /// dropped. If a fresh block cannot be obtained the old array is released
    /// (its elements dropped) and the error is returned.
    ///
    /// # Safety
    /// `ptr` must have come from `arr`/`reallocate` on this resource with
    /// capacity `old_len`, and all `old_len` slots must be initialized.
    unsafe fn reallocate(&self, ptr: NonNull<T>, old_len: usize, new_len: usize) -> Result<NonNull<T>> {
        if new_len < old_len {
            // SAFETY: slots `new_len..old_len` are live by contract.
            unsafe { system::drop_range(ptr, new_len, old_len) };
        }
        // SAFETY: `ptr` has capacity `old_len` by contract.
        match unsafe { system::array_realloc(ptr, old_len, new_len) } {
            Ok(new) => Ok(new),
            Err(e) => {
                let live = old_len.min(new_len);
                // SAFETY: the old block is still ours after a failed realloc.
                unsafe {
                    system::drop_range(ptr, 0, live);
                    system::array_free(ptr, old_len);
                }
                Err(e)
            }
        }
    }

    /// Returns storage obtained from `raw`.
    ///
    /// # Safety
    /// `ptr` must have come from `raw(layout)` on this resource.
    unsafe fn deallocate_raw(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded from the caller.
        unsafe { system::raw_free(ptr, layout) }
    }
}

/// A provider of uninitialized contiguous storage for `T`.
///
/// Blocks are handled as raw slots: the resource never constructs or drops
/// elements. Containers track which slots are live.
pub trait ArrayResource<T> {
    /// Uninitialized storage for `len` elements. `len == 0` and zero-sized `T`
    /// yield a dangling, well-aligned pointer.
    fn allocate(&self, len: usize) -> Result<NonNull<T>>;

    /// Moves the first `min(old_len, new_len)` slots into a block of
    /// `new_len` slots.
    ///
    /// On failure the old block is untouched and still owned by the caller.
    ///
    /// # Safety
    /// * `ptr` must have come from this resource with capacity `old_len`.
    /// * Any live element in slots `new_len..old_len` must already have been
    ///   dropped or moved out.
    unsafe fn reallocate(&self, ptr: NonNull<T>, old_len: usize, new_len: usize) -> Result<NonNull<T>>;

    /// Returns a block of `len` slots. Live elements are *not* dropped.
    ///
    /// # Safety
    /// `ptr` must have come from this resource with capacity `len`.
    unsafe fn deallocate(&self, ptr: NonNull<T>, len: usize);
}

/// A borrowed resource serves the same blocks as the resource itself.
impl<T, A: ArrayResource<T> + ?Sized> ArrayResource<T> for &A {
    fn allocate(&self, len: usize) -> Result<NonNull<T>> {
        (**self).allocate(len)
    }

    unsafe fn reallocate(&self, ptr: NonNull<T>, old_len: usize, new_len: usize) -> Result<NonNull<T>> {
        // SAFETY: forwarded from the caller.
        unsafe { (**self).reallocate(ptr, old_len, new_len) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<T>, len: usize) {
        // SAFETY: forwarded from the caller.
        unsafe { (**self).deallocate(ptr, len) }
    }
}

/// Whether relocating `T` needs more care than a byte copy, i.e. whether it
/// has drop glue.
pub const fn is_trivial<T>() -> bool {
    !core::mem::needs_drop::<T>()
}
