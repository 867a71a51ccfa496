//! Memory sources for the collections in this crate.

pub mod alloc;
