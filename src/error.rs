use thiserror::Error;

/// Every way an operation in this crate can fail.
///
/// All variants except [`Error::Io`] carry a short static message naming the
/// violated condition, e.g. `"Index out of range"`.
#[derive(Debug, Error)]
pub enum Error {
    /// Requested storage could not be obtained.
    #[error("failed allocation: {0}")]
    FailedAlloc(&'static str),

    /// Read or write through a handle whose storage was never allocated.
    #[error("uninitialized memory: {0}")]
    UninitializedMemory(&'static str),

    /// An index or position past the current logical size.
    #[error("out of range: {0}")]
    OutOfRange(&'static str),

    /// A caller broke the allocator's bookkeeping contract.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// Generic contract violation (empty `back()`, a `get()` on none, ...).
    #[error("{0}")]
    Exception(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// `true` for [`Error::FailedAlloc`].
    pub fn is_alloc(&self) -> bool {
        matches!(self, Self::FailedAlloc(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
