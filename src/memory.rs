//! Memory resources: where containers and pointers get their storage.
//!
//! A [`Resource<T>`] hands out storage for single objects, an
//! [`ArrayResource<T>`] hands out uninitialized contiguous blocks. Every
//! container in this crate takes its resource as a type parameter and
//! defaults to the global-allocator backed [`SystemResource`] /
//! [`SystemArrayResource`].
//!
//! [`MonotonicResource`] is a bump allocator built from fixed-size
//! [`Page`]s with a free list, suited to many small, same-typed objects whose
//! memory can be reclaimed all at once.

mod lazy;
mod monotonic;
mod page;
mod resource;
pub(crate) mod system;

#[cfg(test)]
mod tests;

pub use lazy::LazyAllocator;
pub use monotonic::{ConcurrentMonotonicResource, MonotonicResource};
pub use page::Page;
pub use resource::{is_trivial, ArrayResource, Resource};
pub use system::{SystemArrayResource, SystemResource};
