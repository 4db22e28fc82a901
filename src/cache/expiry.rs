//! Expiry Index Module
//!
//! Ordered index from cache key to expiry deadline. Backs the eager expiry
//! sweep: the store peeks the earliest deadline and removes entries until it
//! reaches one that is still alive.

use std::collections::{BTreeSet, HashMap};

// == Expiry Index ==
/// Maps keys to expiry deadlines, ordered by `(deadline, key)`.
///
/// Owned by a single [`super::CacheStore`] and only touched under that
/// store's lock. Insert, remove and min-peek are all `O(log n)`.
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    /// Entries ordered by deadline, ties broken by key
    by_deadline: BTreeSet<(i64, String)>,
    /// Current deadline per key
    deadlines: HashMap<String, i64>,
}

impl ExpiryIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    // == Add ==
    /// Tracks `key` under `deadline_nanos`, replacing any prior deadline.
    pub fn add(&mut self, key: &str, deadline_nanos: i64) {
        if let Some(old) = self.deadlines.insert(key.to_string(), deadline_nanos) {
            self.by_deadline.remove(&(old, key.to_string()));
        }
        self.by_deadline.insert((deadline_nanos, key.to_string()));
    }

    // == Remove ==
    /// Stops tracking `key`. No-op if the key is absent.
    pub fn remove(&mut self, key: &str) {
        if let Some(old) = self.deadlines.remove(key) {
            self.by_deadline.remove(&(old, key.to_string()));
        }
    }

    // == Peek Min ==
    /// Returns the key with the earliest deadline, if any.
    pub fn peek_min(&self) -> Option<(&str, i64)> {
        self.by_deadline
            .iter()
            .next()
            .map(|(deadline, key)| (key.as_str(), *deadline))
    }

    // == Length ==
    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Returns true if no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Current deadline for `key`, if tracked.
    #[allow(dead_code)]
    pub fn deadline_of(&self, key: &str) -> Option<i64> {
        self.deadlines.get(key).copied()
    }
}
