use std::{
    fmt, mem,
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
    slice,
};

use crate::{
    memory::{ArrayResource, Resource, SystemArrayResource, SystemResource},
    Error, Result,
};

/// Sole owner of one object allocated through `R`.
///
/// A unique pointer may be null. Dropping it drops the object and returns its
/// storage to the resource.
pub struct UniquePtr<T, R: Resource<T> = SystemResource> {
    object: Option<NonNull<T>>,
    resource: R,
}

impl<T, R: Resource<T>> UniquePtr<T, R> {
    pub fn new(value: T) -> Result<Self>
    where
        R: Default,
    {
        Self::new_in(value, R::default())
    }

    pub fn new_in(value: T, resource: R) -> Result<Self> {
        let object = resource.allocate(value)?;
        Ok(Self {
            object: Some(object),
            resource,
        })
    }

    pub fn null() -> Self
    where
        R: Default,
    {
        Self::null_in(R::default())
    }

    pub fn null_in(resource: R) -> Self {
        Self {
            object: None,
            resource,
        }
    }

    pub fn is_null(&self) -> bool {
        self.object.is_none()
    }

    pub fn try_get(&self) -> Option<&T> {
        // SAFETY: `self` uniquely owns the live object.
        self.object.map(|p| unsafe { &*p.as_ptr() })
    }

    pub fn try_get_mut(&mut self) -> Option<&mut T> {
        // SAFETY: `self` uniquely owns the live object and is borrowed mutably.
        self.object.map(|p| unsafe { &mut *p.as_ptr() })
    }

    pub fn get(&self) -> Result<&T> {
        self.try_get()
            .ok_or(Error::UninitializedMemory("Null unique pointer"))
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Detaches the object without freeing it. The caller becomes
    /// responsible for returning it to this pointer's resource.
    #[must_use = "the released pointer must be returned to the resource"]
    pub fn release(&mut self) -> Option<NonNull<T>> {
        self.object.take()
    }

    /// Frees the current object (if any) and adopts `object`.
    ///
    /// # Safety
    /// `object`, if present, must have come from `allocate` on this pointer's
    /// resource and must not be owned by anything else.
    pub unsafe fn reset(&mut self, object: Option<NonNull<T>>) {
        let old = mem::replace(&mut self.object, object);
        if let Some(old) = old {
            // SAFETY: `old` was uniquely owned by `self`.
            unsafe { self.resource.deallocate(old) };
        }
    }

    /// Moves ownership out, leaving `self` null.
    pub fn take(&mut self) -> Self
    where
        R: Clone,
    {
        Self {
            object: self.object.take(),
            resource: self.resource.clone(),
        }
    }

    /// Moves the object out and returns its storage to the resource.
    pub fn into_inner(mut self) -> Option<T> {
        let object = self.object.take()?;
        // SAFETY: the object is live and uniquely owned; reading moves it out,
        // so the storage is returned without dropping.
        unsafe {
            let value = object.as_ptr().read();
            self.resource.deallocate_with::<false>(object);
            Some(value)
        }
    }
}

impl<T, R: Resource<T>> Drop for UniquePtr<T, R> {
    fn drop(&mut self) {
        if let Some(object) = self.object.take() {
            // SAFETY: `object` was uniquely owned by `self`.
            unsafe { self.resource.deallocate(object) };
        }
    }
}

impl<T, R: Resource<T> + Default> Default for UniquePtr<T, R> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T, R: Resource<T>> Deref for UniquePtr<T, R> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        self.get().unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T, R: Resource<T>> DerefMut for UniquePtr<T, R> {
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T {
        self.try_get_mut()
            .unwrap_or_else(|| panic!("{}", Error::UninitializedMemory("Null unique pointer")))
    }
}

impl<T: fmt::Debug, R: Resource<T>> fmt::Debug for UniquePtr<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_get() {
            Some(value) => f.debug_tuple("UniquePtr").field(value).finish(),
            None => f.write_str("UniquePtr(null)"),
        }
    }
}

// SAFETY: the pointer uniquely owns its object.
unsafe impl<T: Send, R: Resource<T> + Send> Send for UniquePtr<T, R> {}
// SAFETY: shared access only hands out `&T`.
unsafe impl<T: Sync, R: Resource<T> + Sync> Sync for UniquePtr<T, R> {}

/// Sole owner of a fixed-length array allocated through an [`ArrayResource`].
pub struct UniqueArray<T, R: ArrayResource<T> = SystemArrayResource<T>> {
    data: NonNull<T>,
    len: usize,
    capacity: usize,
    resource: R,
}

impl<T, R: ArrayResource<T>> UniqueArray<T, R> {
    /// Copies every element of `items` into a fresh array.
    pub fn from_slice(items: &[T]) -> Result<Self>
    where
        T: Clone,
        R: Default,
    {
        Self::from_slice_in(items, R::default())
    }

    pub fn from_slice_in(items: &[T], resource: R) -> Result<Self>
    where
        T: Clone,
    {
        let data = resource.allocate(items.len())?;
        let mut out = Self {
            data,
            len: 0,
            capacity: items.len(),
            resource,
        };
        for item in items {
            // SAFETY: `len < items.len()`, the allocated length.
            unsafe { out.data.as_ptr().add(out.len).write(item.clone()) };
            // Counted one at a time so a panicking `clone` drops only what
            // was written.
            out.len += 1;
        }
        Ok(out)
    }

    /// Moves the `N` elements of `items` into a fresh array.
    pub fn from_array<const N: usize>(items: [T; N]) -> Result<Self>
    where
        R: Default,
    {
        let resource = R::default();
        let data = resource.allocate(N)?;
        let items = mem::ManuallyDrop::new(items);
        // SAFETY: `data` holds `N` slots and `items` is never dropped, so each
        // element is moved exactly once.
        unsafe { ptr::copy_nonoverlapping(items.as_ptr(), data.as_ptr(), N) };
        Ok(Self {
            data,
            len: N,
            capacity: N,
            resource,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        // SAFETY: all `len` slots are initialized.
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: all `len` slots are initialized and uniquely borrowed.
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.len) }
    }
}

impl<T, R: ArrayResource<T>> Drop for UniqueArray<T, R> {
    fn drop(&mut self) {
        // SAFETY: slots `0..len` are live and the block has `capacity` slots.
        unsafe {
            ptr::drop_in_place(self.as_mut_slice());
            self.resource.deallocate(self.data, self.capacity);
        }
    }
}

impl<T, R: ArrayResource<T>> Deref for UniqueArray<T, R> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, R: ArrayResource<T>> DerefMut for UniqueArray<T, R> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: fmt::Debug, R: ArrayResource<T>> fmt::Debug for UniqueArray<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

// SAFETY: the array uniquely owns its elements.
unsafe impl<T: Send, R: ArrayResource<T> + Send> Send for UniqueArray<T, R> {}
// SAFETY: shared access only hands out `&[T]`.
unsafe impl<T: Sync, R: ArrayResource<T> + Sync> Sync for UniqueArray<T, R> {}
