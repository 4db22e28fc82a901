//! Group Module
//!
//! A group is a named cache namespace: it composes the main cache, an
//! optional hot cache for values owned by other nodes, the loader, the peer
//! router, and per-key single-flight so each key sees at most one
//! concurrent origin fetch and at most one concurrent remove fan-out.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheStats, SyncCache};
use crate::error::{CacheError, ConfigError, Result};
use crate::peers::{PeerClient, PeerPicker};
use crate::singleflight::SingleFlight;
use crate::value::{unix_nanos_now, ByteView};
use crate::wire::CacheRequest;

// == Loader ==
/// Computes a value for a key from the origin data source.
///
/// Called outside every cache lock; concurrent calls for one key are
/// collapsed by single-flight. Failures are usually reported as
/// [`CacheError::Loader`].
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, key: &str) -> Result<ByteView>;
}

/// Adapts a closure into a [`Loader`].
pub struct LoaderFn<F>(pub F);

#[async_trait]
impl<F, Fut> Loader for LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ByteView>> + Send + 'static,
{
    async fn load(&self, key: &str) -> Result<ByteView> {
        (self.0)(key.to_string()).await
    }
}

// == Group Registry ==
/// Process-level handle mapping group names to groups.
///
/// Constructed once and passed by reference; building a second group under
/// an existing name fails.
#[derive(Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl GroupRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the group registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    /// Returns every registered group, in unspecified order.
    pub fn groups(&self) -> Vec<Arc<Group>> {
        self.groups.read().values().cloned().collect()
    }

    fn insert(&self, group: Arc<Group>) -> std::result::Result<(), ConfigError> {
        let mut groups = self.groups.write();
        if groups.contains_key(group.name()) {
            return Err(ConfigError::DuplicateGroup(group.name().to_string()));
        }
        groups.insert(group.name().to_string(), group);
        Ok(())
    }
}

// == Group Builder ==
/// Collects a group's configuration before first use; once built, the
/// loader, caches and TTLs are immutable.
pub struct GroupBuilder {
    name: String,
    cache_bytes: usize,
    loader: Arc<dyn Loader>,
    hot_cache_bytes: Option<usize>,
    empty_key_ttl: Duration,
}

impl GroupBuilder {
    /// Starts a builder for a group holding up to `cache_bytes` bytes in
    /// its main cache (0 = unbounded).
    pub fn new(
        name: impl Into<String>,
        cache_bytes: usize,
        loader: impl Loader + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            cache_bytes,
            loader: Arc::new(loader),
            hot_cache_bytes: None,
            empty_key_ttl: Duration::ZERO,
        }
    }

    /// Enables the hot cache for values owned by other nodes.
    pub fn hot_cache_bytes(mut self, bytes: usize) -> Self {
        self.hot_cache_bytes = Some(bytes);
        self
    }

    /// Caches a synthetic empty value for `ttl` whenever the loader errors,
    /// shielding the origin from repeated misses.
    pub fn empty_key_ttl(mut self, ttl: Duration) -> Self {
        self.empty_key_ttl = ttl;
        self
    }

    /// Builds the group and registers it.
    pub fn build(self, registry: &GroupRegistry) -> std::result::Result<Arc<Group>, ConfigError> {
        let hot_cache = match self.hot_cache_bytes {
            Some(0) => return Err(ConfigError::InvalidHotCacheSize),
            Some(bytes) => Some(SyncCache::new(bytes)),
            None => None,
        };
        let group = Arc::new(Group {
            name: self.name,
            loader: self.loader,
            main_cache: SyncCache::new(self.cache_bytes),
            hot_cache,
            peers: OnceLock::new(),
            load_flight: SingleFlight::new(),
            remove_flight: SingleFlight::new(),
            empty_key_ttl: self.empty_key_ttl,
        });
        registry.insert(Arc::clone(&group))?;
        Ok(group)
    }
}

// == Group Stats ==
/// Statistics snapshot for one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupStats {
    pub name: String,
    pub main: CacheStats,
    pub hot: Option<CacheStats>,
}

// == Group ==
/// A named cache namespace with its own loader and local caches.
pub struct Group {
    name: String,
    loader: Arc<dyn Loader>,
    /// Values this node owns, populated by the loader
    main_cache: SyncCache,
    /// Values owned by other nodes, populated from peer responses
    hot_cache: Option<SyncCache>,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    /// One concurrent origin fetch per key
    load_flight: SingleFlight<Result<ByteView>>,
    /// Separate coordinator so a remove never coalesces with a read
    remove_flight: SingleFlight<Result<()>>,
    empty_key_ttl: Duration,
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("empty_key_ttl", &self.empty_key_ttl)
            .finish_non_exhaustive()
    }
}

impl Group {
    /// The group's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wires the peer router in. May be called at most once.
    pub fn register_peers(
        &self,
        peers: Arc<dyn PeerPicker>,
    ) -> std::result::Result<(), ConfigError> {
        self.peers
            .set(peers)
            .map_err(|_| ConfigError::PeersAlreadyRegistered)
    }

    // == Get ==
    /// Returns the value for `key`, consulting the main cache, the hot
    /// cache, the owning peer, and finally the loader.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }
        if let Some(view) = self.main_cache.get(key) {
            debug!(group = %self.name, key, "main cache hit");
            return Ok(view);
        }
        if let Some(hot) = &self.hot_cache {
            if let Some(view) = hot.get(key) {
                debug!(group = %self.name, key, "hot cache hit");
                return Ok(view);
            }
        }
        self.load(key).await
    }

    // == Remove ==
    /// Removes `key` everywhere: from the owning peer first, then locally,
    /// then best-effort from every other peer in parallel.
    ///
    /// If the owner cannot be reached the error is returned and this node
    /// keeps its copy. Fan-out failures are reported after every peer has
    /// been tried, carrying the last observed error.
    pub async fn remove(&self, key: &str) -> Result<()> {
        self.remove_flight
            .work(key, || async {
                let mut owner: Option<Arc<dyn PeerClient>> = None;
                if let Some(peers) = self.peers.get() {
                    if let Some(peer) = peers.pick_peer(key) {
                        self.remove_from_peer(peer.as_ref(), key).await?;
                        owner = Some(peer);
                    }
                }

                self.remove_locally(key);

                if let Some(peers) = self.peers.get() {
                    let others: Vec<_> = peers
                        .get_all()
                        .into_iter()
                        .filter(|client| {
                            owner
                                .as_ref()
                                .map_or(true, |owned| !Arc::ptr_eq(client, owned))
                        })
                        .collect();
                    let results = join_all(
                        others
                            .iter()
                            .map(|client| self.remove_from_peer(client.as_ref(), key)),
                    )
                    .await;
                    if let Some(err) = results.into_iter().filter_map(|result| result.err()).last()
                    {
                        return Err(CacheError::RemoveFanout(err.to_string()));
                    }
                }
                Ok(())
            })
            .await
    }

    /// Removes `key` from this node's caches only.
    pub fn remove_locally(&self, key: &str) {
        self.main_cache.remove(key);
        if let Some(hot) = &self.hot_cache {
            hot.remove(key);
        }
    }

    // == Maintenance ==
    /// Purges expired entries from both caches. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let mut removed = self.main_cache.purge_expired();
        if let Some(hot) = &self.hot_cache {
            removed += hot.purge_expired();
        }
        removed
    }

    /// Statistics snapshot across both caches.
    pub fn stats(&self) -> GroupStats {
        GroupStats {
            name: self.name.clone(),
            main: self.main_cache.stats(),
            hot: self.hot_cache.as_ref().map(SyncCache::stats),
        }
    }

    /// Single-flighted load: ask the owning peer if the key lives
    /// elsewhere, otherwise (or on peer failure) fall back to the loader.
    async fn load(&self, key: &str) -> Result<ByteView> {
        self.load_flight
            .work(key, || async {
                if let Some(peers) = self.peers.get() {
                    if let Some(peer) = peers.pick_peer(key) {
                        match self.load_from_peer(peer.as_ref(), key).await {
                            Ok(view) => {
                                if let Some(hot) = &self.hot_cache {
                                    hot.add(key, view.clone());
                                }
                                return Ok(view);
                            }
                            Err(err) => {
                                warn!(
                                    group = %self.name, key, %err,
                                    "peer fetch failed, falling back to loader"
                                );
                            }
                        }
                    }
                }
                self.load_locally(key).await
            })
            .await
    }

    /// Loads from the user loader and populates the main cache. A loader
    /// error turns into a short-lived empty value when negative caching is
    /// enabled.
    async fn load_locally(&self, key: &str) -> Result<ByteView> {
        let view = match self.loader.load(key).await {
            Ok(view) => view,
            Err(err) => {
                if self.empty_key_ttl.is_zero() {
                    return Err(err);
                }
                debug!(group = %self.name, key, "caching empty value for failed load");
                ByteView::with_ttl(Vec::<u8>::new(), self.empty_key_ttl)
            }
        };
        self.main_cache.add(key, view.clone());
        Ok(view)
    }

    /// Fetches from a peer, rejecting responses that expired in transit.
    async fn load_from_peer(&self, peer: &dyn PeerClient, key: &str) -> Result<ByteView> {
        let request = CacheRequest {
            group: self.name.clone(),
            key: key.to_string(),
        };
        let response = peer.fetch(&request).await?;
        if response.expire != 0 && response.expire < unix_nanos_now() {
            return Err(CacheError::PeerExpired);
        }
        Ok(match response.expire {
            0 => ByteView::new(response.value),
            deadline => ByteView::expiring(response.value, deadline),
        })
    }

    async fn remove_from_peer(&self, peer: &dyn PeerClient, key: &str) -> Result<()> {
        let request = CacheRequest {
            group: self.name.clone(),
            key: key.to_string(),
        };
        peer.remove(&request).await
    }
}
