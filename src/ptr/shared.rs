use std::{fmt, marker::PhantomData, ops::Deref, ptr::NonNull};

use crate::{
    memory::{Resource, SystemResource},
    ptr::{AtomicCount, LocalCount, RefCount},
    Error, Result,
};

/// Reference-counted pointer whose object and count word are allocated
/// separately, through `R` and `CR`.
///
/// A pointer is either null (no object, no count) or owning. The object is
/// dropped and both allocations returned exactly when the count goes from 1
/// to 0. Moving a pointer transfers ownership without touching the count;
/// [`SharedPtr::take`] does the same explicitly and leaves a null behind.
///
/// `C` picks the counting flavour: [`LocalCount`] for single-threaded use,
/// [`AtomicCount`] for [`ConcurrentPtr`].
///
/// # Examples
///
/// ```
/// # use pmr_kit::SharedPtr;
/// # use assert2::assert;
/// let p: SharedPtr<i32> = SharedPtr::new(42).unwrap();
/// let q = p.clone();
/// assert!(p.use_count() == 2);
/// drop(q);
/// assert!(p.use_count() == 1);
/// assert!(*p == 42);
/// ```
pub struct SharedPtr<T, C = LocalCount, R = SystemResource, CR = SystemResource>
where
    C: RefCount,
    R: Resource<T>,
    CR: Resource<C>,
{
    inner: Option<(NonNull<T>, NonNull<C>)>,
    resource: R,
    count_resource: CR,
    _marker: PhantomData<(T, C)>,
}

/// A [`SharedPtr`] with an atomic count, shareable across threads.
pub type ConcurrentPtr<T, R = SystemResource, CR = SystemResource> = SharedPtr<T, AtomicCount, R, CR>;

impl<T, C, R, CR> SharedPtr<T, C, R, CR>
where
    C: RefCount,
    R: Resource<T>,
    CR: Resource<C>,
{
    pub fn new(value: T) -> Result<Self>
    where
        R: Default,
        CR: Default,
    {
        Self::new_in(value, R::default(), CR::default())
    }

    /// Allocates `value` through `resource` and a count of one through
    /// `count_resource`.
    pub fn new_in(value: T, resource: R, count_resource: CR) -> Result<Self> {
        let object = resource.allocate(value)?;
        let count = match count_resource.allocate(C::one()) {
            Ok(count) => count,
            Err(e) => {
                // SAFETY: `object` was just allocated and is not shared.
                unsafe { resource.deallocate(object) };
                return Err(e);
            }
        };
        Ok(Self {
            inner: Some((object, count)),
            resource,
            count_resource,
            _marker: PhantomData,
        })
    }

    pub fn null() -> Self
    where
        R: Default,
        CR: Default,
    {
        Self::null_in(R::default(), CR::default())
    }

    pub fn null_in(resource: R, count_resource: CR) -> Self {
        Self {
            inner: None,
            resource,
            count_resource,
            _marker: PhantomData,
        }
    }

    pub fn is_null(&self) -> bool {
        self.inner.is_none()
    }

    /// Number of owners sharing the object; `0` for a null pointer.
    pub fn use_count(&self) -> usize {
        // SAFETY: the count lives as long as any owner, including `self`.
        self.inner.map_or(0, |(_, count)| unsafe { count.as_ref() }.get())
    }

    pub fn try_get(&self) -> Option<&T> {
        // SAFETY: the object lives as long as any owner, including `self`.
        self.inner.map(|(object, _)| unsafe { &*object.as_ptr() })
    }

    pub fn get(&self) -> Result<&T> {
        self.try_get()
            .ok_or(Error::UninitializedMemory("Null shared pointer"))
    }

    /// Whether both pointers share one object (or are both null).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.inner.map(|(o, _)| o) == other.inner.map(|(o, _)| o)
    }

    /// Gives up this owner's share and becomes null.
    pub fn reset(&mut self) {
        let Some((object, count)) = self.inner.take() else {
            return;
        };
        // SAFETY: `count` is live while this owner holds its share.
        let last = unsafe { count.as_ref() }.decrement();
        if last {
            // SAFETY: no other owner remains, so nothing can observe the object
            // or count after this point.
            unsafe {
                self.resource.deallocate(object);
                self.count_resource.deallocate(count);
            }
        }
    }

    /// Moves ownership out, leaving `self` null. The count is unchanged.
    pub fn take(&mut self) -> Self
    where
        R: Clone,
        CR: Clone,
    {
        Self {
            inner: self.inner.take(),
            resource: self.resource.clone(),
            count_resource: self.count_resource.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, C, R, CR> Clone for SharedPtr<T, C, R, CR>
where
    C: RefCount,
    R: Resource<T> + Clone,
    CR: Resource<C> + Clone,
{
    fn clone(&self) -> Self {
        if let Some((_, count)) = self.inner {
            // SAFETY: `count` is live while `self` owns a share.
            unsafe { count.as_ref() }.increment();
        }
        Self {
            inner: self.inner,
            resource: self.resource.clone(),
            count_resource: self.count_resource.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, C, R, CR> Drop for SharedPtr<T, C, R, CR>
where
    C: RefCount,
    R: Resource<T>,
    CR: Resource<C>,
{
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T, C, R, CR> Default for SharedPtr<T, C, R, CR>
where
    C: RefCount,
    R: Resource<T> + Default,
    CR: Resource<C> + Default,
{
    fn default() -> Self {
        Self::null()
    }
}

impl<T, C, R, CR> Deref for SharedPtr<T, C, R, CR>
where
    C: RefCount,
    R: Resource<T>,
    CR: Resource<C>,
{
    type Target = T;

    /// # Panics
    /// On a null pointer. See [`SharedPtr::get`].
    #[track_caller]
    fn deref(&self) -> &T {
        self.get().unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T, C, R, CR> PartialEq for SharedPtr<T, C, R, CR>
where
    T: PartialEq,
    C: RefCount,
    R: Resource<T>,
    CR: Resource<C>,
{
    /// Compares the pointed-to objects. Two nulls are equal.
    fn eq(&self, other: &Self) -> bool {
        self.try_get() == other.try_get()
    }
}

impl<T, C, R, CR> fmt::Debug for SharedPtr<T, C, R, CR>
where
    T: fmt::Debug,
    C: RefCount,
    R: Resource<T>,
    CR: Resource<C>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_get() {
            Some(value) => f
                .debug_struct("SharedPtr")
                .field("value", value)
                .field("use_count", &self.use_count())
                .finish(),
            None => f.write_str("SharedPtr(null)"),
        }
    }
}

impl<T, C, R, CR> fmt::Display for SharedPtr<T, C, R, CR>
where
    T: fmt::Display,
    C: RefCount,
    R: Resource<T>,
    CR: Resource<C>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_get() {
            Some(value) => value.fmt(f),
            None => f.write_str("null"),
        }
    }
}

// SAFETY: the count is atomic, so owners on different threads may clone and
// drop concurrently. The object is shared (`Sync`) and may be dropped on any
// thread (`Send`); both resources are used from whichever thread drops last.
unsafe impl<T, R, CR> Send for SharedPtr<T, AtomicCount, R, CR>
where
    T: Send + Sync,
    R: Resource<T> + Send + Sync,
    CR: Resource<AtomicCount> + Send + Sync,
{
}

// SAFETY: as above; `&SharedPtr` only hands out `&T` and clones.
unsafe impl<T, R, CR> Sync for SharedPtr<T, AtomicCount, R, CR>
where
    T: Send + Sync,
    R: Resource<T> + Send + Sync,
    CR: Resource<AtomicCount> + Send + Sync,
{
}
