#![cfg_attr(feature = "no-std", no_std)]

//! A circular doubly-linked list anchored by a sentinel node, with nodes
//! drawn from a pluggable allocator.

extern crate alloc;

#[cfg(all(test, feature = "no-std"))]
extern crate std;

pub mod collections;
pub mod memory;

pub use collections::list::{Cursor, CursorMut, EmplaceError, IntoIter, Iter, IterMut, List};
pub use memory::alloc::{AllocError, AllocResult, Counting, Global, RawAllocator, SlotPool};
