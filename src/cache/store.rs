//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU eviction, a byte
//! budget, and TTL expiration backed by the ordered expiry index.

use std::collections::HashMap;

use crate::cache::{CacheStats, ExpiryIndex, LruTracker, SWEEP_BATCH};
use crate::value::{unix_nanos_now, ByteView};

/// Callback invoked whenever an entry leaves the cache.
///
/// Runs under the cache lock; it must not call back into the cache.
pub type EvictCallback = Box<dyn FnMut(&str, &ByteView) + Send>;

// == Cache Store ==
/// Capacity-bounded cache storage with LRU eviction and TTL support.
///
/// The byte budget accounts `key.len() + value.len()` per entry; a budget
/// of zero means unbounded. Not thread-safe on its own; see
/// [`super::SyncCache`].
pub struct CacheStore {
    /// Maximum byte budget, 0 = unbounded
    max_bytes: usize,
    /// Bytes currently accounted
    used_bytes: usize,
    /// Key-value storage
    entries: HashMap<String, ByteView>,
    /// Recency order for eviction
    recency: LruTracker,
    /// Deadlines of entries that carry an expiry
    expiries: ExpiryIndex,
    /// Performance statistics
    stats: CacheStats,
    /// Optional hook fired on every removal
    on_evict: Option<EvictCallback>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("max_bytes", &self.max_bytes)
            .field("used_bytes", &self.used_bytes)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given byte budget.
    pub fn new(max_bytes: usize) -> Self {
        Self::with_evict_callback(max_bytes, None)
    }

    /// Creates a new CacheStore that fires `on_evict` on every removal.
    pub fn with_evict_callback(max_bytes: usize, on_evict: Option<EvictCallback>) -> Self {
        Self {
            max_bytes,
            used_bytes: 0,
            entries: HashMap::new(),
            recency: LruTracker::new(),
            expiries: ExpiryIndex::new(),
            stats: CacheStats::new(),
            on_evict,
        }
    }

    // == Get ==
    /// Retrieves the value for `key`, marking it most recently used.
    ///
    /// An entry whose deadline has passed is removed on the spot and
    /// reported as a miss.
    pub fn get(&mut self, key: &str) -> Option<ByteView> {
        let expired = match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                return None;
            }
            Some(value) => value.is_expired_at(unix_nanos_now()),
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_eviction();
            self.stats.record_miss();
            return None;
        }

        self.recency.touch(key);
        self.stats.record_hit();
        self.entries.get(key).cloned()
    }

    // == Add ==
    /// Stores `value` under `key`, then enforces the byte budget.
    ///
    /// Replacing an existing key adjusts the accounted size and re-sets the
    /// expiry-index entry. Budget enforcement first sweeps expired entries,
    /// then evicts from the LRU end; the freshly added entry sits at the
    /// MRU end and so is only evicted if it alone exceeds the budget. Adds
    /// are never rejected.
    pub fn add(&mut self, key: String, value: ByteView) {
        match self.entries.get(&key) {
            Some(old) => {
                self.used_bytes -= old.len();
                self.used_bytes += value.len();
            }
            None => {
                self.used_bytes += key.len() + value.len();
            }
        }
        self.recency.touch(&key);
        match value.expires_at() {
            Some(deadline) => self.expiries.add(&key, deadline),
            None => self.expiries.remove(&key),
        }
        self.entries.insert(key, value);

        // Reclaim expired entries before touching live ones.
        while self.max_bytes != 0 && self.used_bytes > self.max_bytes {
            if self.remove_expired(SWEEP_BATCH) > 0 {
                break;
            }
        }
        while self.max_bytes != 0 && self.used_bytes > self.max_bytes {
            let Some(oldest) = self.recency.peek_lru().cloned() else {
                break;
            };
            self.remove_entry(&oldest);
            self.stats.record_eviction();
        }
    }

    // == Remove ==
    /// Removes `key` from the cache. Returns whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.remove_entry(key).is_some()
    }

    // == Remove Expired ==
    /// Removes up to `n` entries whose deadline has passed, earliest first.
    ///
    /// Returns the unused part of the budget: a return value greater than
    /// zero means no expired entry remains.
    pub fn remove_expired(&mut self, mut n: usize) -> usize {
        let now = unix_nanos_now();
        while n > 0 {
            let key = match self.expiries.peek_min() {
                Some((key, deadline)) if deadline <= now => key.to_string(),
                _ => break,
            };
            self.remove_entry(&key);
            self.stats.record_eviction();
            n -= 1;
        }
        n
    }

    // == Purge Expired ==
    /// Removes every expired entry. Returns the number removed.
    pub fn purge_expired(&mut self) -> usize {
        let mut removed = 0;
        loop {
            let remaining = self.remove_expired(SWEEP_BATCH);
            removed += SWEEP_BATCH - remaining;
            if remaining > 0 {
                return removed;
            }
        }
    }

    // == Length ==
    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes currently accounted against the budget.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats.used_bytes = self.used_bytes;
        stats
    }

    /// Unlinks `key` from every internal structure and fires the eviction
    /// hook. Returns the removed value.
    fn remove_entry(&mut self, key: &str) -> Option<ByteView> {
        let value = self.entries.remove(key)?;
        self.recency.remove(key);
        self.used_bytes -= key.len() + value.len();
        if value.expires_at().is_some() {
            self.expiries.remove(key);
        }
        if let Some(on_evict) = self.on_evict.as_mut() {
            on_evict(key, &value);
        }
        Some(value)
    }
}

#[cfg(test)]
impl CacheStore {
    /// Cross-checks the internal structures against each other.
    pub(crate) fn assert_consistent(&self) {
        assert_eq!(
            self.entries.len(),
            self.recency.len(),
            "recency list and key map diverged"
        );
        let accounted: usize = self
            .entries
            .iter()
            .map(|(key, value)| key.len() + value.len())
            .sum();
        assert_eq!(accounted, self.used_bytes, "byte accounting diverged");
        let with_expiry = self
            .entries
            .values()
            .filter(|value| value.expires_at().is_some())
            .count();
        assert_eq!(with_expiry, self.expiries.len(), "expiry index diverged");
        for (key, value) in &self.entries {
            if let Some(deadline) = value.expires_at() {
                assert_eq!(self.expiries.deadline_of(key), Some(deadline));
            }
        }
        if self.max_bytes != 0 {
            assert!(self.used_bytes <= self.max_bytes, "byte budget exceeded");
        }
    }
}
