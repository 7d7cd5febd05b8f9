// src/dedup/cache.rs

use indexmap::IndexSet;
use tracing::debug;

use crate::dedup::key::{dedup_key, DedupKey};
use crate::protocol::Event;

/// Default soft bound on remembered fingerprints.
pub const DEFAULT_CAPACITY: usize = 100;

/// Number of most-recent fingerprints kept after a trim.
pub const DEFAULT_RETAIN: usize = 50;

/// Bounded, insertion-ordered set of recently seen event fingerprints.
///
/// Whenever an insert pushes the size past `capacity`, the cache is trimmed
/// on the spot down to the `retain` most recently inserted keys. The size is
/// therefore never above `capacity` once `should_process` returns.
#[derive(Debug)]
pub struct DedupCache {
    keys: IndexSet<DedupKey>,
    capacity: usize,
    retain: usize,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_RETAIN)
    }
}

impl DedupCache {
    /// `retain` is clamped to `capacity`.
    pub fn new(capacity: usize, retain: usize) -> Self {
        Self {
            keys: IndexSet::with_capacity(capacity + 1),
            capacity,
            retain: retain.min(capacity),
        }
    }

    /// Test-and-insert in one step: `true` the first time an occurrence is
    /// seen, `false` for every repeat still remembered.
    ///
    /// Unrecognised events carry no fingerprint and are always let through;
    /// the router ignores them anyway.
    pub fn should_process(&mut self, event: &Event, now_ms: i64) -> bool {
        match dedup_key(event, now_ms) {
            Some(key) => self.insert_key(key),
            None => true,
        }
    }

    /// Same as [`should_process`](Self::should_process) for a precomputed key.
    pub fn insert_key(&mut self, key: DedupKey) -> bool {
        if self.keys.contains(&key) {
            debug!(%key, "duplicate event suppressed");
            return false;
        }

        self.keys.insert(key);
        if self.keys.len() > self.capacity {
            let excess = self.keys.len() - self.retain;
            self.keys.drain(..excess);
            debug!(kept = self.keys.len(), "dedup cache trimmed");
        }
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}
