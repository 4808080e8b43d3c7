//! Fixed-capacity ring buffer with a cyclic push mode and a split write mode.

use std::{
    fmt,
    mem::MaybeUninit,
    ptr::{self, NonNull},
    slice,
};

use crate::{
    memory::{ArrayResource, SystemArrayResource},
    Error, Result,
};

/// Backing storage for a [`RingBuffer`]: exactly `CAP` possibly-uninitialized
/// slots. Storage never drops the values in it.
pub trait Slots<T, const CAP: usize>: Sized {
    fn allocate() -> Result<Self>;

    fn as_ptr(&self) -> *const T;

    fn as_mut_ptr(&mut self) -> *mut T;
}

/// Slots stored inline, inside the ring buffer itself.
pub struct InlineSlots<T, const CAP: usize>([MaybeUninit<T>; CAP]);

impl<T, const CAP: usize> Slots<T, CAP> for InlineSlots<T, CAP> {
    fn allocate() -> Result<Self> {
        Ok(Self([const { MaybeUninit::uninit() }; CAP]))
    }

    fn as_ptr(&self) -> *const T {
        self.0.as_ptr() as *const T
    }

    fn as_mut_ptr(&mut self) -> *mut T {
        self.0.as_mut_ptr() as *mut T
    }
}

/// Slots in one block from an [`ArrayResource`].
pub struct HeapSlots<T, const CAP: usize, R: ArrayResource<T> = SystemArrayResource<T>> {
    block: NonNull<T>,
    resource: R,
}

impl<T, const CAP: usize, R: ArrayResource<T> + Default> Slots<T, CAP> for HeapSlots<T, CAP, R> {
    fn allocate() -> Result<Self> {
        let resource = R::default();
        let block = resource.allocate(CAP)?;
        Ok(Self { block, resource })
    }

    fn as_ptr(&self) -> *const T {
        self.block.as_ptr()
    }

    fn as_mut_ptr(&mut self) -> *mut T {
        self.block.as_ptr()
    }
}

impl<T, const CAP: usize, R: ArrayResource<T>> Drop for HeapSlots<T, CAP, R> {
    fn drop(&mut self) {
        // SAFETY: the block came from `self.resource` with `CAP` slots.
        unsafe { self.resource.deallocate(self.block, CAP) };
    }
}

// SAFETY: the slots are uniquely owned by the ring buffer holding them.
unsafe impl<T: Send, const CAP: usize, R: ArrayResource<T> + Send> Send for HeapSlots<T, CAP, R> {}

/// A fixed array of `CAP` slots and a write cursor `head` in `0..=CAP`.
///
/// * [`push_back`](RingBuffer::push_back) is cyclic: at `head == CAP` it
///   wraps to 0 and overwrites from the start.
/// * [`write`](RingBuffer::write) is a bounded split write: a block that does
///   not fit before the end is split, the remainder written from slot 0.
/// * [`write_contiguous`](RingBuffer::write_contiguous) never wraps and
///   refuses blocks that would run past the end.
///
/// [`flush`](RingBuffer::flush) rewinds `head` to 0. The pending contents are
/// the slots `0..head`.
///
/// # Examples
///
/// ```
/// # use pmr_kit::RingBuffer;
/// # use assert2::assert;
/// let mut ring: RingBuffer<u8, 8> = RingBuffer::new().unwrap();
/// ring.write(b"xxxxxx").unwrap();
/// ring.write(b"ABCDE").unwrap();
/// assert!(ring.pos() == 3);
/// assert!(ring.as_slice() == b"CDE");
/// assert!(ring.get(6).unwrap() == &b'A');
/// ```
///
/// A zero-capacity ring buffer is rejected when it is built:
///
/// ```compile_fail
/// # use pmr_kit::RingBuffer;
/// let ring: RingBuffer<u8, 0> = RingBuffer::new().unwrap();
/// ```
pub struct RingBuffer<T, const CAP: usize, S: Slots<T, CAP> = InlineSlots<T, CAP>> {
    slots: S,
    head: usize,
    /// Slots `0..filled` hold initialized values.
    filled: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T, const CAP: usize, S: Slots<T, CAP>> RingBuffer<T, CAP, S> {
    const NON_EMPTY: () = assert!(CAP > 0, "ring buffer must hold at least one slot");

    pub fn new() -> Result<Self> {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;
        Ok(Self {
            slots: S::allocate()?,
            head: 0,
            filled: 0,
            _marker: std::marker::PhantomData,
        })
    }

    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// The write cursor.
    pub fn pos(&self) -> usize {
        self.head
    }

    pub fn is_full(&self) -> bool {
        self.head >= CAP
    }

    pub fn is_empty(&self) -> bool {
        self.head == 0
    }

    /// Free slots before the end.
    pub fn remaining(&self) -> usize {
        CAP - self.head
    }

    /// Puts `value` at `head`, first wrapping to 0 if the buffer is full.
    /// Overwritten values are dropped.
    pub fn push_back(&mut self, value: T) {
        self.emplace_back(|| value);
    }

    pub fn emplace_back(&mut self, make: impl FnOnce() -> T) -> &mut T {
        if self.head >= CAP {
            self.head = 0;
        }
        let value = make();
        // SAFETY: `CAP > 0` is checked in `new`, so after the wrap above
        // `head < CAP` and the offset stays inside the slots.
        let slot = unsafe { self.slots.as_mut_ptr().add(self.head) };
        // SAFETY: slots below `filled` hold a live value that the assignment
        // drops; slot `filled` is uninitialized and written without a drop.
        unsafe {
            if self.head < self.filled {
                *slot = value;
            } else {
                slot.write(value);
                self.filled += 1;
            }
        }
        self.head += 1;
        // SAFETY: the slot was just initialized.
        unsafe { &mut *slot }
    }

    fn copy_in(&mut self, at: usize, items: &[T])
    where
        T: Copy,
    {
        debug_assert!(at <= self.filled && at + items.len() <= CAP);
        // SAFETY: `at + items.len() <= CAP`; `T: Copy`, so overwriting live
        // values needs no drop and `items` cannot alias our slots.
        unsafe { ptr::copy_nonoverlapping(items.as_ptr(), self.slots.as_mut_ptr().add(at), items.len()) };
        self.filled = self.filled.max(at + items.len());
    }

    /// Writes `items` at `head`. When they do not fit before the end, the
    /// leading `CAP - head` items fill the tail and the rest are written from
    /// slot 0, leaving `head` just past them.
    ///
    /// # Errors
    /// [`Error::OutOfRange`] if `items` is longer than the whole buffer.
    pub fn write(&mut self, items: &[T]) -> Result<()>
    where
        T: Copy,
    {
        if items.len() > CAP {
            return Err(Error::OutOfRange("Write larger than ring buffer"));
        }
        if self.head >= CAP {
            self.head = 0;
        }
        let fit = CAP - self.head;
        if items.len() <= fit {
            self.copy_in(self.head, items);
            self.head += items.len();
            return Ok(());
        }
        let (tail, wrapped) = items.split_at(fit);
        self.copy_in(self.head, tail);
        self.copy_in(0, wrapped);
        self.head = wrapped.len();
        Ok(())
    }

    /// Writes `items` at `head` without wrapping.
    ///
    /// # Errors
    /// [`Error::OutOfRange`] if `head + items.len() > CAP`. Nothing is written.
    pub fn write_contiguous(&mut self, items: &[T]) -> Result<()>
    where
        T: Copy,
    {
        if items.len() > self.remaining() {
            return Err(Error::OutOfRange("Ring buffer overflow"));
        }
        self.copy_in(self.head, items);
        self.head += items.len();
        Ok(())
    }

    /// Moves `head` forward over slots that already hold values.
    pub fn advance(&mut self, n: usize) -> Result<()> {
        match self.head.checked_add(n) {
            Some(to) if to <= self.filled => {
                self.head = to;
                Ok(())
            }
            _ => Err(Error::OutOfRange("Advance past written slots")),
        }
    }

    /// Rewinds `head` to 0. Values stay in place until overwritten.
    pub fn flush(&mut self) {
        self.head = 0;
    }

    /// The slot at `index`, if it has ever been written.
    pub fn get(&self, index: usize) -> Result<&T> {
        if index >= self.filled {
            return Err(Error::OutOfRange("Index out of range"));
        }
        // SAFETY: slots below `filled` are initialized.
        Ok(unsafe { &*self.slots.as_ptr().add(index) })
    }

    /// The pending values, `0..head`.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `head <= filled`, so these slots are initialized.
        unsafe { slice::from_raw_parts(self.slots.as_ptr(), self.head) }
    }
}

impl<T, const CAP: usize, S: Slots<T, CAP>> Drop for RingBuffer<T, CAP, S> {
    fn drop(&mut self) {
        // SAFETY: slots `0..filled` are initialized and dropped once here.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.slots.as_mut_ptr(), self.filled));
        }
    }
}

impl<T: fmt::Debug, const CAP: usize, S: Slots<T, CAP>> fmt::Debug for RingBuffer<T, CAP, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("head", &self.head)
            .field("pending", &self.as_slice())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{drop_counts, Tracked};
    use assert2::{assert, check, let_assert};

    type Heap8 = RingBuffer<u8, 8, HeapSlots<u8, 8>>;

    #[test]
    fn split_write_wraps() {
        let mut ring: RingBuffer<u8, 8> = RingBuffer::new().unwrap();
        ring.write(b"012345").unwrap();
        assert!(ring.pos() == 6);
        ring.write(b"ABCDE").unwrap();
        check!(ring.get(6).unwrap() == &b'A');
        check!(ring.get(7).unwrap() == &b'B');
        check!(ring.get(0).unwrap() == &b'C');
        check!(ring.get(1).unwrap() == &b'D');
        check!(ring.get(2).unwrap() == &b'E');
        check!(ring.get(3).unwrap() == &b'3');
        check!(ring.pos() == 3);
    }

    #[test]
    fn write_of_exact_remaining_fills_without_wrapping() {
        let mut ring = Heap8::new().unwrap();
        ring.write(b"abc").unwrap();
        ring.write(b"defgh").unwrap();
        assert!(ring.is_full());
        assert!(ring.as_slice() == b"abcdefgh");
        ring.write(b"ij").unwrap();
        assert!(ring.as_slice() == b"ij");
    }

    #[test]
    fn last_n_written_match_input() {
        let mut ring: RingBuffer<u8, 8> = RingBuffer::new().unwrap();
        for start in 0..8 {
            ring.flush();
            ring.write(&b"########"[..start]).unwrap();
            ring.write(b"12345").unwrap();
            let mut last = Vec::new();
            for i in 0..5 {
                let idx = (ring.pos() + 8 - 5 + i) % 8;
                last.push(*ring.get(idx).unwrap());
            }
            assert!(last == b"12345", "start {start}");
        }
    }

    #[test]
    fn oversized_write_is_rejected() {
        let mut ring: RingBuffer<u8, 4> = RingBuffer::new().unwrap();
        let_assert!(Err(Error::OutOfRange(_)) = ring.write(b"12345"));
        assert!(ring.is_empty());
    }

    #[test]
    fn contiguous_write_refuses_overflow() {
        let mut ring = Heap8::new().unwrap();
        ring.write_contiguous(b"123456").unwrap();
        let_assert!(Err(Error::OutOfRange("Ring buffer overflow")) = ring.write_contiguous(b"789"));
        assert!(ring.as_slice() == b"123456");
        ring.write_contiguous(b"78").unwrap();
        assert!(ring.is_full());
    }

    #[test]
    fn push_back_is_cyclic() {
        let mut ring: RingBuffer<u32, 3> = RingBuffer::new().unwrap();
        for i in 0..5 {
            ring.push_back(i);
        }
        assert!(ring.pos() == 2);
        assert!(ring.as_slice() == [3, 4]);
        assert!(*ring.get(2).unwrap() == 2);
    }

    #[test]
    fn single_slot_push_back_overwrites_in_place() {
        drop_counts::reset_counts();
        let mut ring: RingBuffer<Tracked, 1> = RingBuffer::new().unwrap();
        for i in 0..4 {
            ring.push_back(Tracked::new(i));
            assert!(ring.pos() == 1);
            assert!(ring.is_full());
            assert!(ring.get(0).unwrap().0 == i);
        }
        let_assert!(Err(Error::OutOfRange(_)) = ring.get(1));
        assert!(drop_counts::total_drop_count() == 3);
        drop(ring);
        assert!(drop_counts::current_live_allocs() == 0);
    }

    #[test]
    fn flush_is_idempotent_and_advance_is_bounded() {
        let mut ring: RingBuffer<u8, 8> = RingBuffer::new().unwrap();
        ring.flush();
        assert!(ring.is_empty());
        ring.write(b"abcd").unwrap();
        ring.flush();
        ring.flush();
        assert!(ring.pos() == 0);
        ring.advance(3).unwrap();
        assert!(ring.as_slice() == b"abc");
        let_assert!(Err(Error::OutOfRange(_)) = ring.advance(2));
    }

    #[test]
    fn overwritten_values_are_dropped() {
        drop_counts::reset_counts();
        {
            let mut ring: RingBuffer<Tracked, 2, HeapSlots<Tracked, 2>> = RingBuffer::new().unwrap();
            for i in 0..5 {
                ring.push_back(Tracked::new(i));
            }
            assert!(drop_counts::total_drop_count() == 3);
        }
        assert!(drop_counts::current_live_allocs() == 0);
    }
}
