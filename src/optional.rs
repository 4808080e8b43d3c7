use crate::{Error, Result};

/// A value that may be absent, with a fallible [`Optional::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Optional<T> {
    value: Option<T>,
}

impl<T> Optional<T> {
    pub const fn none() -> Self {
        Self { value: None }
    }

    pub const fn some(value: T) -> Self {
        Self { value: Some(value) }
    }

    /// Stores `value`, dropping any previous one, and returns it.
    pub fn emplace(&mut self, value: T) -> &mut T {
        self.value.insert(value)
    }

    pub fn is_some(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_none(&self) -> bool {
        self.value.is_none()
    }

    /// # Errors
    /// [`Error::Exception`] when empty.
    pub fn get(&self) -> Result<&T> {
        self.value.as_ref().ok_or(Error::Exception("Optional has no value"))
    }

    pub fn get_mut(&mut self) -> Result<&mut T> {
        self.value.as_mut().ok_or(Error::Exception("Optional has no value"))
    }

    pub fn take(&mut self) -> Option<T> {
        self.value.take()
    }

    pub fn into_option(self) -> Option<T> {
        self.value
    }

    pub fn as_option(&self) -> Option<&T> {
        self.value.as_ref()
    }
}

impl<T> Default for Optional<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T> From<Option<T>> for Optional<T> {
    fn from(value: Option<T>) -> Self {
        Self { value }
    }
}

impl<T> From<Optional<T>> for Option<T> {
    fn from(opt: Optional<T>) -> Self {
        opt.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{assert, let_assert};

    #[test]
    fn none_has_no_value() {
        let o: Optional<i32> = Optional::none();
        assert!(o.is_none());
        let_assert!(Err(Error::Exception("Optional has no value")) = o.get());
    }

    #[test]
    fn emplace_replaces() {
        let mut o = Optional::some(String::from("a"));
        o.emplace("b".into()).push('c');
        assert!(o.get().unwrap() == "bc");
        assert!(o.take() == Some("bc".into()));
        assert!(o.is_none());
    }

    #[test]
    fn converts_with_option() {
        let o: Optional<u8> = Some(3).into();
        assert!(o == Optional::some(3));
        assert!(Option::from(o) == Some(3));
    }
}
