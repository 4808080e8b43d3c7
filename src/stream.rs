//! A read cursor over an owned [`Vector`].

use crate::{
    memory::{ArrayResource, SystemArrayResource},
    Error, Optional, Result, Vector,
};

/// Owns a [`Vector`] and walks it front to back. Reads return copies
/// wrapped in [`Optional`], which is empty once the cursor runs off the end.
///
/// # Examples
///
/// ```
/// # use pmr_kit::{Stream, Vector};
/// # use assert2::assert;
/// let tokens: Vector<char> = "ab".chars().collect();
/// let mut stream = Stream::new(tokens);
/// assert!(stream.peek().into_option() == Some('a'));
/// assert!(stream.next().into_option() == Some('a'));
/// assert!(stream.curr().into_option() == Some('a'));
/// assert!(stream.next().into_option() == Some('b'));
/// assert!(stream.next().is_none());
/// ```
#[derive(Debug)]
pub struct Stream<
    T,
    const GROWTH_PCT: usize = 180,
    const INITIAL_CAPACITY: usize = 25,
    R: ArrayResource<T> = SystemArrayResource<T>,
> {
    data: Vector<T, GROWTH_PCT, INITIAL_CAPACITY, R>,
    pos: usize,
}

impl<T, const G: usize, const I: usize, R: ArrayResource<T>> Stream<T, G, I, R> {
    pub fn new(data: Vector<T, G, I, R>) -> Self {
        Self { data, pos: 0 }
    }

    pub fn push(&mut self, value: T) -> Result<()> {
        self.data.push_back(value)
    }

    pub fn emplace_back(&mut self, make: impl FnOnce() -> T) -> Result<&mut T> {
        self.data.emplace_back(make)
    }

    /// The element `n` places past the cursor, without moving it.
    pub fn peek_at(&self, n: usize) -> Optional<T>
    where
        T: Clone,
    {
        match self.pos.checked_add(n) {
            Some(at) if at < self.data.len() => Optional::some(self.data[at].clone()),
            _ => Optional::none(),
        }
    }

    pub fn peek(&self) -> Optional<T>
    where
        T: Clone,
    {
        self.peek_at(0)
    }

    /// The element most recently returned by [`next`](Stream::next).
    pub fn curr(&self) -> Optional<T>
    where
        T: Clone,
    {
        if self.pos == 0 || self.pos > self.data.len() {
            return Optional::none();
        }
        Optional::some(self.data[self.pos - 1].clone())
    }

    /// Returns the element under the cursor and advances past it.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Optional<T>
    where
        T: Clone,
    {
        let item = self.peek();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// # Errors
    /// [`Error::OutOfRange`] if `pos` is past the end; the cursor stays put.
    pub fn set_pos(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::OutOfRange("Position out of bounds"));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &Vector<T, G, I, R> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Vector<T, G, I, R> {
        &mut self.data
    }

    pub fn into_inner(self) -> Vector<T, G, I, R> {
        self.data
    }
}

impl<T, const G: usize, const I: usize, R: ArrayResource<T>> From<Vector<T, G, I, R>> for Stream<T, G, I, R> {
    fn from(data: Vector<T, G, I, R>) -> Self {
        Self::new(data)
    }
}
