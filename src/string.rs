use std::{
    borrow::Borrow,
    fmt,
    hash::{Hash, Hasher},
    ops::{Add, Index, IndexMut},
    ptr::{self, NonNull},
    slice,
};

use tracing::trace;

use crate::{
    memory::{ArrayResource, SystemArrayResource},
    simd, trace_verbose, Error, Result,
};

mod view;

#[cfg(test)]
mod tests;

pub use view::StringView;

/// A growable byte string drawing its buffer from an [`ArrayResource`].
///
/// One byte past `max_capacity` is always reserved, so [`OwnedString::c_str`]
/// can append a NUL without reallocating. The default string owns no buffer
/// at all.
///
/// # Examples
///
/// ```
/// # use pmr_kit::OwnedString;
/// # use assert2::assert;
/// let hi: OwnedString = OwnedString::from("hi");
/// let there: OwnedString = OwnedString::from(" there");
/// let mut greeting = &hi + &there;
/// assert!(greeting.len() == 8);
/// assert!(greeting.c_str().unwrap() == b"hi there\0");
/// assert!(hi == "hi");
/// ```
pub struct OwnedString<const GROWTH_PCT: usize = 180, R: ArrayResource<u8> = SystemArrayResource<u8>> {
    buffer: Option<NonNull<u8>>,
    len: usize,
    capacity: usize,
    resource: R,
}

impl<const GROWTH_PCT: usize, R: ArrayResource<u8>> OwnedString<GROWTH_PCT, R> {
    const VALID_GROWTH: () = assert!(GROWTH_PCT > 100, "growth factor must exceed 100 percent");

    pub fn new() -> Self
    where
        R: Default,
    {
        Self::new_in(R::default())
    }

    pub fn new_in(resource: R) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_GROWTH;
        Self {
            buffer: None,
            len: 0,
            capacity: 0,
            resource,
        }
    }

    /// An empty string with room for `capacity` bytes plus the terminator.
    pub fn with_capacity(capacity: usize) -> Result<Self>
    where
        R: Default,
    {
        let mut s = Self::new();
        s.reserve(capacity)?;
        Ok(s)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self>
    where
        R: Default,
    {
        Self::from_bytes_in(bytes, R::default())
    }

    pub fn from_bytes_in(bytes: &[u8], resource: R) -> Result<Self> {
        let mut s = Self::new_in(resource);
        s.reserve(bytes.len())?;
        s.push_bytes(bytes)?;
        Ok(s)
    }

    /// Copies `bytes` up to (not including) its first NUL, or all of it if
    /// there is none.
    pub fn from_nul_terminated(bytes: &[u8]) -> Result<Self>
    where
        R: Default,
    {
        let len = simd::nul_position(bytes).unwrap_or(bytes.len());
        Self::from_bytes(&bytes[..len])
    }

    /// Copies the NUL-terminated string at `ptr`.
    ///
    /// # Safety
    /// `ptr` must point to a readable, NUL-terminated byte sequence. The
    /// length scan may read past the terminator; see [`simd::c_str_len`].
    pub unsafe fn from_c_str(ptr: *const u8) -> Result<Self>
    where
        R: Default,
    {
        // SAFETY: forwarded from the caller.
        let bytes = unsafe {
            let len = simd::c_str_len(ptr);
            slice::from_raw_parts(ptr, len)
        };
        Self::from_bytes(bytes)
    }

    /// Adopts a buffer that was allocated by `resource`.
    ///
    /// # Safety
    /// * `buffer` must have come from `resource.allocate(capacity)` (or a
    ///   reallocation to `capacity`), and ownership passes to the string.
    /// * `capacity >= 1` and `len < capacity`.
    /// * Bytes `0..len` must be initialized.
    pub unsafe fn from_raw_parts(buffer: NonNull<u8>, len: usize, capacity: usize, resource: R) -> Self {
        debug_assert!(len < capacity);
        let mut s = Self::new_in(resource);
        s.buffer = Some(buffer);
        s.len = len;
        s.capacity = capacity;
        s
    }

    /// Wraps `buf` without copying or allocating.
    ///
    /// The result borrows `buf` and never frees it. Its accounting mirrors an
    /// owned string: `len == capacity == buf.len()` and
    /// `max_capacity == buf.len() - 1`.
    pub fn no_copy(buf: &[u8]) -> StringView<'_> {
        StringView::new(buf)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total bytes in the buffer, terminator slot included.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes available to content: one less than `capacity`.
    pub fn max_capacity(&self) -> usize {
        self.capacity.saturating_sub(1)
    }

    pub fn is_initialized(&self) -> bool {
        self.buffer.is_some()
    }

    fn set_max_capacity(&mut self, max_capacity: usize) -> Result<()> {
        let capacity = max_capacity
            .checked_add(1)
            .ok_or(Error::FailedAlloc("Capacity overflow"))?;
        let buffer = match self.buffer {
            // SAFETY: the buffer holds `self.capacity` bytes and the live
            // prefix `0..len` fits in the new capacity.
            Some(buf) => unsafe { self.resource.reallocate(buf, self.capacity, capacity)? },
            None => self.resource.allocate(capacity)?,
        };
        trace!(from = self.capacity, to = capacity, "string buffer resized");
        self.buffer = Some(buffer);
        self.capacity = capacity;
        Ok(())
    }

    /// Ensures room for `additional` more bytes, growing to exactly
    /// `len + additional` if needed.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let needed = self
            .len
            .checked_add(additional)
            .ok_or(Error::FailedAlloc("Capacity overflow"))?;
        if self.buffer.is_none() || needed > self.max_capacity() {
            self.set_max_capacity(needed)?;
        }
        Ok(())
    }

    /// Ensures room for `additional` more bytes, growing geometrically to the
    /// smallest `capacity * growth^k` that fits.
    pub fn reserve_growth(&mut self, additional: usize) -> Result<()> {
        let needed = self
            .len
            .checked_add(additional)
            .ok_or(Error::FailedAlloc("Capacity overflow"))?;
        if self.buffer.is_none() {
            return self.set_max_capacity(needed);
        }
        if needed <= self.max_capacity() {
            return Ok(());
        }
        let mut target = Self::grow(self.capacity)?;
        while target < needed {
            target = Self::grow(target)?;
        }
        self.set_max_capacity(target)
    }

    fn grow(capacity: usize) -> Result<usize> {
        let scaled = capacity
            .checked_mul(GROWTH_PCT)
            .ok_or(Error::FailedAlloc("Capacity overflow"))?
            .div_ceil(100);
        Ok(scaled.max(capacity + 1))
    }

    pub fn push(&mut self, byte: u8) -> Result<()> {
        self.push_bytes(&[byte])
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve_growth(bytes.len())?;
        let buf = self.buffer.ok_or(Error::UninitializedMemory("String not initialized"))?;
        // SAFETY: `reserve_growth` guarantees `len + bytes.len() <= max_capacity`,
        // and `bytes` cannot alias a buffer we uniquely own.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), buf.as_ptr().add(self.len), bytes.len()) };
        self.len += bytes.len();
        trace_verbose!(len = self.len, "string push");
        Ok(())
    }

    pub fn push_str(&mut self, s: &str) -> Result<()> {
        self.push_bytes(s.as_bytes())
    }

    /// Writes a NUL after the content and returns content plus terminator.
    ///
    /// Never reallocates: the terminator slot is always reserved.
    ///
    /// # Errors
    /// [`Error::UninitializedMemory`] if no buffer was ever allocated.
    pub fn c_str(&mut self) -> Result<&[u8]> {
        let buf = self.buffer.ok_or(Error::UninitializedMemory("String not initialized"))?;
        // SAFETY: `len <= max_capacity < capacity`, so slot `len` is in bounds;
        // bytes `0..len` are initialized.
        unsafe {
            buf.as_ptr().add(self.len).write(0);
            Ok(slice::from_raw_parts(buf.as_ptr(), self.len + 1))
        }
    }

    /// Pointer to the start of the buffer, for writers that fill it directly
    /// and then [`calibrate`](Self::calibrate).
    pub fn ptr(&self) -> Result<NonNull<u8>> {
        self.buffer.ok_or(Error::UninitializedMemory("String not initialized"))
    }

    /// Sets the length without touching the buffer.
    ///
    /// # Safety
    /// `len <= max_capacity()` and bytes `0..len` must be initialized.
    pub unsafe fn calibrate(&mut self, len: usize) {
        debug_assert!(len <= self.max_capacity());
        self.len = len;
    }

    /// Sets the length to zero, keeping the buffer.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self.buffer {
            // SAFETY: bytes `0..len` are initialized and owned by `self`.
            Some(buf) => unsafe { slice::from_raw_parts(buf.as_ptr(), self.len) },
            None => &[],
        }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self.buffer {
            // SAFETY: as above, and `self` is uniquely borrowed.
            Some(buf) => unsafe { slice::from_raw_parts_mut(buf.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    pub fn to_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.as_bytes())
    }

    pub fn at(&self, index: usize) -> Result<&u8> {
        if self.buffer.is_none() {
            return Err(Error::UninitializedMemory("String not initialized"));
        }
        self.as_bytes().get(index).ok_or(Error::OutOfRange("Index out of range"))
    }

    pub fn at_mut(&mut self, index: usize) -> Result<&mut u8> {
        if self.buffer.is_none() {
            return Err(Error::UninitializedMemory("String not initialized"));
        }
        self.as_bytes_mut()
            .get_mut(index)
            .ok_or(Error::OutOfRange("Index out of range"))
    }

    pub fn starts_with(&self, prefix: impl AsRef<[u8]>) -> bool {
        simd::has_prefix(self.as_bytes(), prefix.as_ref())
    }

    /// A borrowed view of the content.
    pub fn view(&self) -> StringView<'_> {
        StringView::new(self.as_bytes())
    }

    /// `self` followed by `other` in a fresh string on a clone of `self`'s
    /// resource. Neither operand changes.
    pub fn concat(&self, other: &[u8]) -> Result<Self>
    where
        R: Clone,
    {
        let mut out = Self::new_in(self.resource.clone());
        out.reserve(self.len + other.len())?;
        out.push_bytes(self.as_bytes())?;
        out.push_bytes(other)?;
        Ok(out)
    }

    pub fn try_clone(&self) -> Result<Self>
    where
        R: Clone,
    {
        if self.buffer.is_none() {
            return Ok(Self::new_in(self.resource.clone()));
        }
        Self::from_bytes_in(self.as_bytes(), self.resource.clone())
    }
}

impl<const G: usize, R: ArrayResource<u8>> Drop for OwnedString<G, R> {
    fn drop(&mut self) {
        if let Some(buf) = self.buffer.take() {
            // SAFETY: the buffer came from `self.resource` with `capacity` bytes.
            unsafe { self.resource.deallocate(buf, self.capacity) };
        }
    }
}

impl<const G: usize, R: ArrayResource<u8> + Default> Default for OwnedString<G, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const G: usize, R: ArrayResource<u8> + Clone> Clone for OwnedString<G, R> {
    /// # Panics
    /// If the copy cannot be allocated.
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<const G: usize, R: ArrayResource<u8> + Default> From<&str> for OwnedString<G, R> {
    /// # Panics
    /// If the buffer cannot be allocated.
    fn from(s: &str) -> Self {
        Self::from_bytes(s.as_bytes()).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<const G: usize, R: ArrayResource<u8> + Default> From<&[u8]> for OwnedString<G, R> {
    /// # Panics
    /// If the buffer cannot be allocated.
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<const G: usize, R: ArrayResource<u8> + Clone> Add<&OwnedString<G, R>> for &OwnedString<G, R> {
    type Output = OwnedString<G, R>;

    /// # Panics
    /// If the result cannot be allocated. See [`OwnedString::concat`].
    fn add(self, rhs: &OwnedString<G, R>) -> OwnedString<G, R> {
        self.concat(rhs.as_bytes()).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<const G: usize, R: ArrayResource<u8> + Clone> Add<&str> for &OwnedString<G, R> {
    type Output = OwnedString<G, R>;

    fn add(self, rhs: &str) -> OwnedString<G, R> {
        self.concat(rhs.as_bytes()).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<const G: usize, R: ArrayResource<u8>> Index<usize> for OwnedString<G, R> {
    type Output = u8;

    #[track_caller]
    fn index(&self, index: usize) -> &u8 {
        self.at(index).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<const G: usize, R: ArrayResource<u8>> IndexMut<usize> for OwnedString<G, R> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut u8 {
        self.at_mut(index).unwrap_or_else(|e| panic!("{e}"))
    }
}

impl<const G: usize, R: ArrayResource<u8>, const H: usize, S: ArrayResource<u8>> PartialEq<OwnedString<H, S>>
    for OwnedString<G, R>
{
    fn eq(&self, other: &OwnedString<H, S>) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<const G: usize, R: ArrayResource<u8>> Eq for OwnedString<G, R> {}

impl<const G: usize, R: ArrayResource<u8>> PartialEq<str> for OwnedString<G, R> {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<const G: usize, R: ArrayResource<u8>> PartialEq<&str> for OwnedString<G, R> {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<const G: usize, R: ArrayResource<u8>> PartialEq<StringView<'_>> for OwnedString<G, R> {
    fn eq(&self, other: &StringView<'_>) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl<const G: usize, R: ArrayResource<u8>> Hash for OwnedString<G, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state)
    }
}

impl<const G: usize, R: ArrayResource<u8>> Borrow<[u8]> for OwnedString<G, R> {
    fn borrow(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<const G: usize, R: ArrayResource<u8>> AsRef<[u8]> for OwnedString<G, R> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<const G: usize, R: ArrayResource<u8>> fmt::Display for OwnedString<G, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        String::from_utf8_lossy(self.as_bytes()).fmt(f)
    }
}

impl<const G: usize, R: ArrayResource<u8>> fmt::Debug for OwnedString<G, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl<const G: usize, R: ArrayResource<u8>> fmt::Write for OwnedString<G, R> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s).map_err(|_| fmt::Error)
    }
}

// SAFETY: the string uniquely owns its buffer.
unsafe impl<const G: usize, R: ArrayResource<u8> + Send> Send for OwnedString<G, R> {}
// SAFETY: shared access only reads the buffer.
unsafe impl<const G: usize, R: ArrayResource<u8> + Sync> Sync for OwnedString<G, R> {}
