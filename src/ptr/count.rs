use std::{
    cell::Cell,
    fmt,
    sync::atomic::{self, AtomicUsize, Ordering},
};

/// The reference-count word behind a [`SharedPtr`](crate::SharedPtr).
pub trait RefCount {
    /// A count of one.
    fn one() -> Self;

    fn increment(&self);

    /// Decrements and returns `true` when this was the last reference. When
    /// it returns `true` every other owner's use of the object
    /// happens-before the return.
    fn decrement(&self) -> bool;

    fn get(&self) -> usize;
}

/// A plain, single-threaded count.
pub struct LocalCount(Cell<usize>);

impl RefCount for LocalCount {
    fn one() -> Self {
        Self(Cell::new(1))
    }

    fn increment(&self) {
        let n = self.0.get();
        if n == usize::MAX {
            std::process::abort();
        }
        self.0.set(n + 1);
    }

    fn decrement(&self) -> bool {
        let n = self.0.get() - 1;
        self.0.set(n);
        n == 0
    }

    fn get(&self) -> usize {
        self.0.get()
    }
}

/// An atomic count for pointers shared across threads.
///
/// Increments are relaxed (a new reference can only be made from an existing
/// one). Decrements release, and the final decrement is followed by an
/// acquire fence so the destructor sees every other owner's writes.
pub struct AtomicCount(AtomicUsize);

const MAX_REFCOUNT: usize = isize::MAX as usize;

impl RefCount for AtomicCount {
    fn one() -> Self {
        Self(AtomicUsize::new(1))
    }

    fn increment(&self) {
        let old = self.0.fetch_add(1, Ordering::Relaxed);
        if old > MAX_REFCOUNT {
            std::process::abort();
        }
    }

    fn decrement(&self) -> bool {
        if self.0.fetch_sub(1, Ordering::Release) != 1 {
            return false;
        }
        atomic::fence(Ordering::Acquire);
        true
    }

    fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

impl fmt::Debug for LocalCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalCount({})", self.get())
    }
}

impl fmt::Debug for AtomicCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AtomicCount({})", self.get())
    }
}
