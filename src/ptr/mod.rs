#![allow(clippy::module_inception)]

mod count;
mod shared;
mod unique;


pub use count::{AtomicCount, LocalCount, RefCount};
pub use shared::{ConcurrentPtr, SharedPtr};
pub use unique::{UniqueArray, UniquePtr};
