//! Data structures and algorithms used by the texparser crates.
//!
//! Nothing in this crate knows about TeX.
//! The scoped map is the storage behind every table in the engine that respects
//! TeX's grouping rules, while the algorithms support macro argument matching
//! and error messages.

pub mod algorithms;
pub mod collections;
