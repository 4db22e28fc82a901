//! Cache Module
//!
//! Provides the capacity-bounded local cache: LRU eviction, TTL expiration
//! backed by an ordered expiry index, and a thread-safe wrapper.

mod expiry;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use expiry::ExpiryIndex;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{CacheStore, EvictCallback};

use parking_lot::Mutex;

use crate::value::ByteView;

// == Public Constants ==
/// Number of expired entries removed per best-effort sweep
pub const SWEEP_BATCH: usize = 10;

// == Sync Cache ==
/// Thread-safe wrapper around [`CacheStore`].
///
/// The engine is constructed lazily on the first write, and every operation
/// starts with a bounded expiry sweep so dead entries neither count against
/// the budget nor reach callers racing the TTL.
#[derive(Debug)]
pub struct SyncCache {
    /// Byte budget handed to the engine when it is first needed
    max_bytes: usize,
    store: Mutex<Option<CacheStore>>,
}

impl SyncCache {
    /// Creates a cache with the given byte budget (0 = unbounded).
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            store: Mutex::new(None),
        }
    }

    // == Get ==
    /// Retrieves the value for `key`, if present and alive.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        let mut guard = self.store.lock();
        let store = guard.as_mut()?;
        store.remove_expired(SWEEP_BATCH);
        store.get(key)
    }

    // == Add ==
    /// Stores `value` under `key`.
    pub fn add(&self, key: &str, value: ByteView) {
        let mut guard = self.store.lock();
        let store = guard.get_or_insert_with(|| CacheStore::new(self.max_bytes));
        store.remove_expired(SWEEP_BATCH);
        store.add(key.to_string(), value);
    }

    // == Remove ==
    /// Removes `key`. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        let mut guard = self.store.lock();
        match guard.as_mut() {
            Some(store) => {
                store.remove_expired(SWEEP_BATCH);
                store.remove(key)
            }
            None => false,
        }
    }

    // == Purge Expired ==
    /// Removes every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let mut guard = self.store.lock();
        match guard.as_mut() {
            Some(store) => store.purge_expired(),
            None => 0,
        }
    }

    // == Length ==
    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.store.lock().as_ref().map_or(0, CacheStore::len)
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Stats ==
    /// Snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.store
            .lock()
            .as_ref()
            .map_or_else(CacheStats::new, CacheStore::stats)
    }
}
