// src/dedup/mod.rs

//! Duplicate suppression for at-least-once push delivery.
//!
//! - [`key`] derives a `DedupKey` per event category.
//! - [`hash`] is the rolling hash used for package output lines.
//! - [`cache`] is the bounded test-and-insert set the router consults.

pub mod cache;
pub mod hash;
pub mod key;

pub use cache::{DedupCache, DEFAULT_CAPACITY, DEFAULT_RETAIN};
pub use hash::rolling_hash;
pub use key::{dedup_key, DedupKey};
