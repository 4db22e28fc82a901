//! Consistent Hash Ring Module
//!
//! Maps keys to peer identities with virtual replicas, so membership
//! changes only remap a small slice of the key space.

use std::collections::HashMap;

/// Hash function over raw bytes, used for both virtual points and keys.
pub type HashFn = Box<dyn Fn(&[u8]) -> u32 + Send + Sync>;

/// Virtual points placed on the ring per real peer.
pub const DEFAULT_REPLICAS: usize = 50;

// == Hash Ring ==
/// Consistent hash ring over peer identifiers.
///
/// Each peer contributes `replicas` virtual points `hash(i ++ peer)` for
/// `i` in `0..replicas`. Lookup walks clockwise to the first point at or
/// past the key's hash, wrapping around the 32-bit space. Thread safety is
/// the caller's concern; the peer router keeps the ring behind its lock.
pub struct HashRing {
    /// Virtual point multiplier per peer
    replicas: usize,
    hash: HashFn,
    /// Sorted virtual point hashes
    points: Vec<u32>,
    /// Virtual point hash to real peer identifier
    peers: HashMap<u32, String>,
}

impl std::fmt::Debug for HashRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("points", &self.points.len())
            .finish()
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(DEFAULT_REPLICAS)
    }
}

impl HashRing {
    // == Constructors ==
    /// Creates a ring hashing with CRC32/IEEE.
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, Box::new(|data| crc32fast::hash(data)))
    }

    /// Creates a ring with a caller-supplied hash function.
    pub fn with_hasher(replicas: usize, hash: HashFn) -> Self {
        Self {
            replicas,
            hash,
            points: Vec::new(),
            peers: HashMap::new(),
        }
    }

    // == Add ==
    /// Places each peer's virtual points on the ring.
    ///
    /// Colliding points resolve last-writer-wins; at the default replica
    /// count over a 32-bit space that loss is negligible.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for peer in peers {
            let peer = peer.into();
            for i in 0..self.replicas {
                let point = (self.hash)(format!("{i}{peer}").as_bytes());
                self.peers.insert(point, peer.clone());
            }
        }
        self.rebuild();
    }

    // == Remove ==
    /// Erases each peer's virtual points from the ring.
    pub fn remove<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let point = (self.hash)(format!("{i}{peer}").as_bytes());
                self.peers.remove(&point);
            }
        }
        self.rebuild();
    }

    // == Get ==
    /// Returns the peer owning `key`, or `None` on an empty ring.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.points.is_empty() {
            return None;
        }
        let hash = (self.hash)(key.as_bytes());
        let idx = self.points.partition_point(|&point| point < hash);
        let point = self.points[idx % self.points.len()];
        self.peers.get(&point).map(String::as_str)
    }

    /// Returns true if no peer is on the ring.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Resorts the point vector from the map's keys after bulk mutation.
    fn rebuild(&mut self) {
        self.points = self.peers.keys().copied().collect();
        self.points.sort_unstable();
    }
}
