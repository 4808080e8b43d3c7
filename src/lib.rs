#![deny(unsafe_op_in_unsafe_fn)]

//! # pmr-kit
//! Containers and smart pointers that take their memory from a pluggable
//! *resource*, plus a page-based bump allocator to plug in.
//!
//! ## Resources
//! Every container names its resource as a type parameter:
//!
//! * node-based containers ([`List`], [`Delist`], [`SharedPtr`],
//!   [`UniquePtr`], [`AlphabeticTrie`]) take a [`Resource<T>`](memory::Resource),
//!   which allocates one object at a time;
//! * contiguous ones ([`Vector`], [`OwnedString`], [`RingBuffer`]) take an
//!   [`ArrayResource<T>`](memory::ArrayResource), which hands out blocks of
//!   uninitialized slots.
//!
//! The defaults, [`SystemResource`](memory::SystemResource) and
//! [`SystemArrayResource`](memory::SystemArrayResource), are zero-sized and
//! go straight to the global allocator. A
//! [`MonotonicResource`](memory::MonotonicResource) serves objects from fixed
//! pages with a free list and never returns a page until it is dropped or
//! trimmed.
//!
//! ```
//! # use pmr_kit::{memory::MonotonicResource, List, ListNode};
//! # use assert2::assert;
//! let nodes: MonotonicResource<ListNode<u32>, 64> = MonotonicResource::new();
//! let mut list = List::new_in(nodes.clone());
//! for i in 0..100 {
//!     list.push_back(i).unwrap();
//! }
//! assert!(nodes.page_count() == 2);
//! assert!(list.iter().sum::<u32>() == 4950);
//! ```
//!
//! ## Lazy initialization
//! [`Vector`] and [`OwnedString`] allocate nothing until first written to;
//! `Vector` also releases its storage when popped back to empty.
//!
//! ## Errors
//! Fallible operations return [`Result`]. Operator sugar that cannot return
//! one (`Index`, `Deref`, `Add`, `Clone`) panics with the error's message.
//!
//! ## Tracing
//! Allocation events are reported through [`tracing`]. Per-element events
//! are only compiled in with the `trace-verbose` feature.

mod error;
mod log;

pub mod ansi;
pub mod delist;
pub mod format;
pub mod list;
pub mod memory;
pub mod optional;
pub mod ostream;
pub mod pair;
pub mod ptr;
pub mod ring_buffer;
pub mod simd;
pub mod stack;
pub mod stream;
pub mod string;
pub mod trie;
pub mod vector;

#[cfg(test)]
mod test_utils;

pub use crate::{
    delist::{Delist, DelistNode},
    error::{Error, Result},
    format::{Emit, Serialize},
    list::{List, ListNode},
    optional::Optional,
    ostream::{ConcurrentOstream, Ostream, ENDL},
    pair::Pair,
    ptr::{ConcurrentPtr, SharedPtr, UniqueArray, UniquePtr},
    ring_buffer::RingBuffer,
    stack::Stack,
    stream::Stream,
    string::{OwnedString, StringView},
    trie::AlphabeticTrie,
    vector::Vector,
};
