use std::{
    cell::RefCell,
    fmt,
    ptr::NonNull,
    rc::Rc,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::error;

use crate::{
    memory::{LazyAllocator, Resource},
    Error, Result,
};

/// A cloneable handle to a single-threaded [`LazyAllocator`].
///
/// Clones share one allocator; [`Default`] creates a fresh one. Objects are
/// dropped outside the allocator borrow, so a destructor may itself release
/// other objects to the same resource.
pub struct MonotonicResource<T, const PAGE: usize = 256> {
    inner: Rc<RefCell<LazyAllocator<T, PAGE, true>>>,
}

impl<T, const PAGE: usize> MonotonicResource<T, PAGE> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(LazyAllocator::new())),
        }
    }

    pub fn live(&self) -> usize {
        self.inner.borrow().live()
    }

    pub fn page_count(&self) -> usize {
        self.inner.borrow().page_count()
    }

    /// See [`LazyAllocator::trim`].
    pub fn trim(&self) -> bool {
        self.inner.borrow_mut().trim()
    }

    /// Whether both handles share one allocator.
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T, const PAGE: usize> Resource<T> for MonotonicResource<T, PAGE> {
    fn allocate(&self, value: T) -> Result<NonNull<T>> {
        let mut alloc = self
            .inner
            .try_borrow_mut()
            .map_err(|_| Error::Exception("Monotonic resource is already in use"))?;
        alloc.alloc(value)
    }

    unsafe fn deallocate_with<const CALL_DROP: bool>(&self, ptr: NonNull<T>) {
        if CALL_DROP {
            // SAFETY: the caller guarantees `ptr` is live and from `allocate`.
            unsafe { ptr.as_ptr().drop_in_place() };
        }
        match self.inner.try_borrow_mut() {
            Ok(mut alloc) => {
                // SAFETY: the object has been dropped or moved out above.
                if let Err(e) = unsafe { alloc.forget(ptr) } {
                    error!(%e, "monotonic resource release failed");
                }
            }
            Err(_) => error!("monotonic resource released while in use; slot leaked"),
        }
    }
}

impl<T, const PAGE: usize> Clone for MonotonicResource<T, PAGE> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, const PAGE: usize> Default for MonotonicResource<T, PAGE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const PAGE: usize> fmt::Debug for MonotonicResource<T, PAGE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(alloc) => f.debug_tuple("MonotonicResource").field(&*alloc).finish(),
            Err(_) => f.write_str("MonotonicResource(<in use>)"),
        }
    }
}

/// The thread-safe counterpart of [`MonotonicResource`]: every allocation and
/// release takes the allocator's mutex.
pub struct ConcurrentMonotonicResource<T, const PAGE: usize = 256> {
    inner: Arc<Mutex<LazyAllocator<T, PAGE, true>>>,
}

impl<T, const PAGE: usize> ConcurrentMonotonicResource<T, PAGE> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(LazyAllocator::new())),
        }
    }

    // A panic while holding the lock cannot leave the allocator's
    // bookkeeping half-updated, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, LazyAllocator<T, PAGE, true>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn live(&self) -> usize {
        self.lock().live()
    }

    pub fn page_count(&self) -> usize {
        self.lock().page_count()
    }

    pub fn trim(&self) -> bool {
        self.lock().trim()
    }

    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T, const PAGE: usize> Resource<T> for ConcurrentMonotonicResource<T, PAGE> {
    fn allocate(&self, value: T) -> Result<NonNull<T>> {
        self.lock().alloc(value)
    }

    unsafe fn deallocate_with<const CALL_DROP: bool>(&self, ptr: NonNull<T>) {
        if CALL_DROP {
            // SAFETY: the caller guarantees `ptr` is live and from `allocate`.
            unsafe { ptr.as_ptr().drop_in_place() };
        }
        // SAFETY: the object has been dropped or moved out above.
        if let Err(e) = unsafe { self.lock().forget(ptr) } {
            error!(%e, "concurrent monotonic resource release failed");
        }
    }
}

impl<T, const PAGE: usize> Clone for ConcurrentMonotonicResource<T, PAGE> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, const PAGE: usize> Default for ConcurrentMonotonicResource<T, PAGE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const PAGE: usize> fmt::Debug for ConcurrentMonotonicResource<T, PAGE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConcurrentMonotonicResource").field(&*self.lock()).finish()
    }
}
