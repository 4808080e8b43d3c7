use std::{
    borrow::Borrow,
    fmt,
    hash::{Hash, Hasher},
};

use crate::{simd, Error, Result};

/// A borrowed, non-owning byte string.
///
/// The view never frees what it points at. `capacity` is the length of the
/// borrowed buffer; `len` starts equal to it and can only shrink.
#[derive(Clone, Copy)]
pub struct StringView<'a> {
    bytes: &'a [u8],
    len: usize,
}

impl<'a> StringView<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            len: bytes.len(),
        }
    }

    /// Views `bytes` up to its first NUL.
    pub fn from_nul_terminated(bytes: &'a [u8]) -> Self {
        let len = simd::nul_position(bytes).unwrap_or(bytes.len());
        Self::new(&bytes[..len])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn max_capacity(&self) -> usize {
        self.bytes.len().saturating_sub(1)
    }

    /// Shortens the view.
    ///
    /// # Errors
    /// [`Error::Exception`] if `len` is larger than the current length.
    pub fn set_len(&mut self, len: usize) -> Result<()> {
        if len > self.len {
            return Err(Error::Exception("Cannot set size larger than current size"));
        }
        self.len = len;
        Ok(())
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        &self.bytes[..self.len]
    }

    pub fn starts_with(&self, prefix: impl AsRef<[u8]>) -> bool {
        simd::has_prefix(self.as_bytes(), prefix.as_ref())
    }
}

impl PartialEq for StringView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for StringView<'_> {}

impl PartialEq<&str> for StringView<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Hash for StringView<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state)
    }
}

impl Borrow<[u8]> for StringView<'_> {
    fn borrow(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for StringView<'_> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<'a> From<&'a str> for StringView<'a> {
    fn from(s: &'a str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl fmt::Display for StringView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        String::from_utf8_lossy(self.as_bytes()).fmt(f)
    }
}

impl fmt::Debug for StringView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringView({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}
