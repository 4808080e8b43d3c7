use std::{
    fmt,
    marker::PhantomData,
    mem,
    ops::{Index, IndexMut},
    ptr::{self, NonNull},
    slice,
};

use tracing::trace;

use crate::{
    memory::{ArrayResource, SystemArrayResource},
    trace_verbose, Error, Result,
};


/// A growable array that allocates nothing until the first insertion.
///
/// The growth factor is expressed in percent (`GROWTH_PCT = 180` grows by
/// 1.8x) and must exceed 100. The first insertion allocates
/// `INITIAL_CAPACITY` slots from the resource `R`.
///
/// Unlike `Vec`, popping the last element releases the storage and returns
/// the vector to its lazy, uninitialized state.
///
/// # Examples
///
/// ```
/// # use pmr_kit::Vector;
/// # use assert2::assert;
/// let mut v: Vector<i32, 200, 4> = Vector::new();
/// assert!(!v.is_initialized());
///
/// v.push_back(1).unwrap();
/// assert!(v.capacity() == 4);
///
/// v.pop_back();
/// assert!(!v.is_initialized());
/// assert!(v.capacity() == 0);
/// ```
pub struct Vector<
    T,
    const GROWTH_PCT: usize = 180,
    const INITIAL_CAPACITY: usize = 25,
    R: ArrayResource<T> = SystemArrayResource<T>,
> {
    data: Option<NonNull<T>>,
    len: usize,
    capacity: usize,
    resource: R,
    _marker: PhantomData<T>,
}

impl<T, const GROWTH_PCT: usize, const INITIAL_CAPACITY: usize, R>
    Vector<T, GROWTH_PCT, INITIAL_CAPACITY, R>
where
    R: ArrayResource<T>,
{
    const VALID_GROWTH: () = assert!(GROWTH_PCT > 100, "growth factor must exceed 100 percent");

    pub fn new() -> Self
    where
        R: Default,
    {
        Self::new_in(R::default())
    }

    /// Creates an empty vector that will draw its storage from `resource`.
    pub fn new_in(resource: R) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_GROWTH;
        Self {
            data: None,
            len: 0,
            capacity: 0,
            resource,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether storage is currently held.
    pub fn is_initialized(&self) -> bool {
        self.data.is_some()
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// The capacity that follows `capacity` under this vector's growth factor.
    ///
    /// Always strictly larger than `capacity`.
    pub fn next_capacity(capacity: usize) -> Result<usize> {
        let scaled = capacity
            .checked_mul(GROWTH_PCT)
            .ok_or(Error::FailedAlloc("Capacity overflow"))?;
        let grown = scaled.div_ceil(100);
        Ok(grown.max(capacity + 1))
    }

    fn set_capacity(&mut self, new_capacity: usize) -> Result<()> {
        let data = match self.data {
            // SAFETY: `ptr` holds `capacity` slots and only slots `0..len` are
            // live; callers never shrink below `len`.
            Some(ptr) => unsafe { self.resource.reallocate(ptr, self.capacity, new_capacity)? },
            None => self.resource.allocate(new_capacity)?,
        };
        trace!(from = self.capacity, to = new_capacity, "vector storage resized");
        self.data = Some(data);
        self.capacity = new_capacity;
        Ok(())
    }

    /// Makes room for one more element, initializing or growing as needed.
    fn reserve_one(&mut self) -> Result<()> {
        if self.data.is_none() && INITIAL_CAPACITY > 0 {
            return self.set_capacity(INITIAL_CAPACITY);
        }
        if self.len == self.capacity {
            let next = Self::next_capacity(self.capacity)?;
            return self.set_capacity(next);
        }
        Ok(())
    }

    /// Releases the storage without dropping any element.
    fn release(&mut self) {
        if let Some(ptr) = self.data.take() {
            // SAFETY: `ptr` came from `self.resource` with `capacity` slots.
            unsafe { self.resource.deallocate(ptr, self.capacity) };
        }
        self.capacity = 0;
        self.len = 0;
    }

    /// Appends `value`, allocating on the first call and growing when full.
    ///
    /// # Errors
    /// Fails with [`Error::FailedAlloc`] if storage cannot be obtained, in
    /// which case the vector is unchanged and `value` is dropped.
    pub fn push_back(&mut self, value: T) -> Result<()> {
        self.emplace_back(|| value).map(|_| ())
    }

    /// Makes room at the back, then constructs the new element in place with
    /// `make`. `make` is not called if room cannot be made.
    pub fn emplace_back(&mut self, make: impl FnOnce() -> T) -> Result<&mut T> {
        self.reserve_one()?;
        let base = self.data.ok_or(Error::UninitializedMemory("Early access to vector"))?;
        // SAFETY: `len < capacity` after `reserve_one`.
        let slot = unsafe { base.as_ptr().add(self.len) };
        // SAFETY: the slot is in bounds and holds no live value.
        unsafe { slot.write(make()) };
        self.len += 1;
        trace_verbose!(len = self.len, "vector push");
        // SAFETY: the slot was just initialized.
        Ok(unsafe { &mut *slot })
    }

    /// Drops the last element. Releases the storage when the vector becomes
    /// empty. Does nothing on an empty vector.
    pub fn pop_back(&mut self) {
        let Some(base) = self.data else { return };
        if self.len == 0 {
            return;
        }
        self.len -= 1;
        // SAFETY: slot `len` was live until the decrement above.
        unsafe { ptr::drop_in_place(base.as_ptr().add(self.len)) };
        if self.len == 0 {
            self.release();
        }
    }

    /// Moves the last element out. The storage is kept even when the vector
    /// becomes empty.
    pub fn pop_back_move(&mut self) -> Result<T> {
        let base = self.data.ok_or(Error::UninitializedMemory("Early access to vector"))?;
        if self.len == 0 {
            return Err(Error::Exception("Vector is empty"));
        }
        self.len -= 1;
        // SAFETY: slot `len` was live and is now outside the live prefix, so
        // it will not be read or dropped again.
        Ok(unsafe { base.as_ptr().add(self.len).read() })
    }

    /// Checked shared access to element `index`.
    pub fn at(&self, index: usize) -> Result<&T> {
        if self.data.is_none() {
            return Err(Error::UninitializedMemory("Early access to vector"));
        }
        self.as_slice().get(index).ok_or(Error::OutOfRange("Index out of range"))
    }

    /// Checked mutable access to element `index`.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T> {
        if self.data.is_none() {
            return Err(Error::UninitializedMemory("Early access to vector"));
        }
        self.as_mut_slice()
            .get_mut(index)
            .ok_or(Error::OutOfRange("Index out of range"))
    }

    pub fn back(&self) -> Result<&T> {
        self.as_slice().last().ok_or(Error::Exception("Vector is empty"))
    }

    pub fn back_mut(&mut self) -> Result<&mut T> {
        self.as_mut_slice().last_mut().ok_or(Error::Exception("Vector is empty"))
    }

    /// Grows the capacity to at least `capacity` and marks the vector
    /// initialized, even for `capacity == 0`.
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        if self.data.is_none() || capacity > self.capacity {
            self.set_capacity(capacity.max(self.capacity))?;
        }
        Ok(())
    }

    /// Resizes the storage to exactly `len()` slots. An empty vector goes back
    /// to the uninitialized state.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        if self.data.is_none() || self.len == self.capacity {
            return Ok(());
        }
        if self.len == 0 {
            self.release();
            return Ok(());
        }
        self.set_capacity(self.len)
    }

    /// Drops every element. The storage is kept.
    pub fn clear(&mut self) {
        let Some(base) = self.data else { return };
        let len = mem::replace(&mut self.len, 0);
        // SAFETY: slots `0..len` were live; `len` is reset first so a
        // panicking destructor cannot cause a double drop.
        unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(base.as_ptr(), len)) };
    }

    /// Releases the storage without running any destructor. The elements are
    /// leaked.
    pub fn forget_elements(&mut self) {
        self.release();
    }

    /// Sets the logical length directly.
    ///
    /// # Safety
    /// * `len <= capacity()`.
    /// * Slots `0..len` must hold initialized values; slots beyond the old
    ///   length become owned by the vector.
    /// * Live values past `len` are leaked, not dropped.
    pub unsafe fn calibrate(&mut self, len: usize) {
        debug_assert!(len <= self.capacity);
        self.len = len;
    }

    /// Raw pointer to the first slot, if storage is held.
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.data
    }

    pub fn as_slice(&self) -> &[T] {
        match self.data {
            // SAFETY: slots `0..len` are initialized and owned by `self`.
            Some(ptr) => unsafe { slice::from_raw_parts(ptr.as_ptr(), self.len) },
            None => &[],
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self.data {
            // SAFETY: slots `0..len` are initialized and uniquely borrowed.
            Some(ptr) => unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Moves the contents out, leaving an empty vector over a clone of the
    /// same resource.
    pub fn take(&mut self) -> Self
    where
        R: Clone,
    {
        let empty = Self::new_in(self.resource.clone());
        mem::replace(self, empty)
    }

    pub fn extend_from_slice(&mut self, items: &[T]) -> Result<()>
    where
        T: Clone,
    {
        let needed = self.len + items.len();
        if needed > self.capacity {
            let mut target = if self.data.is_none() {
                INITIAL_CAPACITY.max(1)
            } else {
                self.capacity
            };
            while target < needed {
                target = Self::next_capacity(target)?;
            }
            self.reserve(target)?;
        }
        for item in items {
            self.push_back(item.clone())?;
        }
        Ok(())
    }

    /// Element-wise copy through a clone of this vector's resource.
    pub fn try_clone(&self) -> Result<Self>
    where
        T: Clone,
        R: Clone,
    {
        let mut copy = Self::new_in(self.resource.clone());
        if self.data.is_some() {
            copy.reserve(self.capacity)?;
            for item in self.iter() {
                copy.push_back(item.clone())?;
            }
        }
        Ok(copy)
    }
}

impl<T, const G: usize, const I: usize, R> Drop for Vector<T, G, I, R>
where
    R: ArrayResource<T>,
{
    fn drop(&mut self) {
        self.clear();
        self.release();
    }
}

impl<T, const G: usize, const I: usize, R> Default for Vector<T, G, I, R>
where
    R: ArrayResource<T> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const G: usize, const I: usize, R> Clone for Vector<T, G, I, R>
where
    T: Clone,
    R: ArrayResource<T> + Clone,
{
    /// # Panics
    /// If the copy cannot be allocated. See [`Vector::try_clone`].
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T, const G: usize, const I: usize, R> Index<usize> for Vector<T, G, I, R>
where
    R: ArrayResource<T>,
{
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &T {
        self.at(index).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T, const G: usize, const I: usize, R> IndexMut<usize> for Vector<T, G, I, R>
where
    R: ArrayResource<T>,
{
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.at_mut(index).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<T: fmt::Debug, const G: usize, const I: usize, R> fmt::Debug for Vector<T, G, I, R>
where
    R: ArrayResource<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, const G: usize, const I: usize, R> PartialEq for Vector<T, G, I, R>
where
    R: ArrayResource<T>,
{
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, const G: usize, const I: usize, R> Eq for Vector<T, G, I, R> where R: ArrayResource<T> {}

impl<T: PartialEq, const G: usize, const I: usize, R> PartialEq<[T]> for Vector<T, G, I, R>
where
    R: ArrayResource<T>,
{
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq, const N: usize, const G: usize, const I: usize, R> PartialEq<[T; N]>
    for Vector<T, G, I, R>
where
    R: ArrayResource<T>,
{
    fn eq(&self, other: &[T; N]) -> bool {
        self.as_slice() == other
    }
}

impl<T, const G: usize, const I: usize, R> Extend<T> for Vector<T, G, I, R>
where
    R: ArrayResource<T>,
{
    /// # Panics
    /// If storage cannot be obtained.
    fn extend<It: IntoIterator<Item = T>>(&mut self, iter: It) {
        for item in iter {
            self.push_back(item).unwrap_or_else(|e| panic!("{e}"));
        }
    }
}

impl<T, const G: usize, const I: usize, R> FromIterator<T> for Vector<T, G, I, R>
where
    R: ArrayResource<T> + Default,
{
    fn from_iter<It: IntoIterator<Item = T>>(iter: It) -> Self {
        let mut v = Self::new();
        v.extend(iter);
        v
    }
}

impl<'a, T, const G: usize, const I: usize, R> IntoIterator for &'a Vector<T, G, I, R>
where
    R: ArrayResource<T>,
{
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// SAFETY: the vector uniquely owns its elements; sending it sends them.
unsafe impl<T: Send, const G: usize, const I: usize, R> Send for Vector<T, G, I, R> where
    R: ArrayResource<T> + Send
{
}

// SAFETY: shared access only hands out `&T`.
unsafe impl<T: Sync, const G: usize, const I: usize, R> Sync for Vector<T, G, I, R> where
    R: ArrayResource<T> + Sync
{
}
