//! Peer Pool Module
//!
//! The peer router: owns the consistent-hash ring and one HTTP client per
//! peer, answers "who owns this key?", and keeps the membership current by
//! consuming discovery events.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use prost::Message;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::discovery::{Discovery, PeerEvent};
use crate::error::{CacheError, Result};
use crate::peers::{PeerClient, PeerPicker};
use crate::ring::{HashRing, DEFAULT_REPLICAS};
use crate::wire::{CacheRequest, CacheResponse};

/// Default path prefix for peer traffic.
pub const DEFAULT_BASE_PATH: &str = "/_peercache/";

// == HTTP Pool ==
/// Peer router backed by the HTTP transport.
///
/// Membership mutations (set_peers, discovery events) take the write lock;
/// routing reads take the shared lock.
pub struct HttpPool {
    /// This node's advertised address, e.g. `http://10.0.0.1:3000`
    addr: String,
    /// Path prefix peers serve cache traffic under
    base_path: String,
    /// Shared connection pool for every peer client
    http: reqwest::Client,
    state: RwLock<PoolState>,
}

struct PoolState {
    ring: HashRing,
    clients: HashMap<String, Arc<HttpClient>>,
}

impl HttpPool {
    // == Constructors ==
    /// Creates a pool for the node advertised at `addr`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_base_path(addr, DEFAULT_BASE_PATH)
    }

    /// Creates a pool serving peer traffic under a custom path prefix.
    /// `base_path` must start and end with `/`.
    pub fn with_base_path(addr: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            base_path: base_path.into(),
            http: reqwest::Client::new(),
            state: RwLock::new(PoolState {
                ring: HashRing::new(DEFAULT_REPLICAS),
                clients: HashMap::new(),
            }),
        }
    }

    /// This node's advertised address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The path prefix peer traffic is served under.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    // == Set Peers ==
    /// Replaces the ring and the client table with the given membership.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers: Vec<String> = peers.into_iter().map(Into::into).collect();
        let mut state = self.state.write();
        state.ring = HashRing::new(DEFAULT_REPLICAS);
        state.ring.add(peers.iter().cloned());
        state.clients = peers
            .into_iter()
            .map(|peer| {
                let client = Arc::new(HttpClient::new(
                    self.http.clone(),
                    &peer,
                    &self.base_path,
                ));
                (peer, client)
            })
            .collect();
    }

    // == Discovery Integration ==
    /// Registers this node with `registry`, seeds the membership, and
    /// spawns a task applying subsequent events.
    ///
    /// The returned handle aborts the subscription on shutdown.
    pub async fn set_registry(
        self: &Arc<Self>,
        registry: Arc<dyn Discovery>,
    ) -> Result<JoinHandle<()>> {
        registry.register(&self.addr).await?;
        // Subscribe before listing so no membership change is missed.
        let mut events = registry.watch().await?;
        let peers = registry.list().await?;
        info!(peers = peers.len(), "discovery membership seeded");
        self.set_peers(peers);

        let pool = Arc::clone(self);
        Ok(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                debug!(?event, "membership change");
                pool.apply_event(event);
            }
        }))
    }

    /// Applies one membership change to the ring and the client table.
    pub fn apply_event(&self, event: PeerEvent) {
        let mut state = self.state.write();
        match event {
            PeerEvent::Joined(addr) => {
                state.ring.add([addr.clone()]);
                let client = Arc::new(HttpClient::new(self.http.clone(), &addr, &self.base_path));
                state.clients.insert(addr, client);
            }
            PeerEvent::Left(addr) => {
                state.ring.remove([addr.as_str()]);
                state.clients.remove(&addr);
            }
        }
    }
}

impl PeerPicker for HttpPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerClient>> {
        let state = self.state.read();
        let peer = state.ring.get(key)?;
        if peer == self.addr {
            return None;
        }
        debug!(peer, key, "picked remote owner");
        state
            .clients
            .get(peer)
            .cloned()
            .map(|client| client as Arc<dyn PeerClient>)
    }

    fn get_all(&self) -> Vec<Arc<dyn PeerClient>> {
        let state = self.state.read();
        state
            .clients
            .iter()
            .filter(|(addr, _)| addr.as_str() != self.addr)
            .map(|(_, client)| Arc::clone(client) as Arc<dyn PeerClient>)
            .collect()
    }
}

// == HTTP Client ==
/// Client for one remote peer.
struct HttpClient {
    /// Peer address plus base path, e.g. `http://10.0.0.2:3000/_peercache/`
    base_url: String,
    http: reqwest::Client,
}

impl HttpClient {
    fn new(http: reqwest::Client, addr: &str, base_path: &str) -> Self {
        Self {
            base_url: format!("{addr}{base_path}"),
            http,
        }
    }

    fn url_for(&self, request: &CacheRequest) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            urlencoding::encode(&request.group),
            urlencoding::encode(&request.key),
        )
    }
}

#[async_trait]
impl PeerClient for HttpClient {
    async fn fetch(&self, request: &CacheRequest) -> Result<CacheResponse> {
        let response = self
            .http
            .get(self.url_for(request))
            .send()
            .await
            .map_err(|err| CacheError::PeerUnavailable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(CacheError::PeerUnavailable(format!(
                "peer returned {}",
                response.status()
            )));
        }
        let body = response
            .bytes()
            .await
            .map_err(|err| CacheError::PeerUnavailable(err.to_string()))?;
        CacheResponse::decode(body)
            .map_err(|err| CacheError::PeerUnavailable(format!("reading response body: {err}")))
    }

    async fn remove(&self, request: &CacheRequest) -> Result<()> {
        let response = self
            .http
            .delete(self.url_for(request))
            .send()
            .await
            .map_err(|err| CacheError::PeerUnavailable(err.to_string()))?;
        if !response.status().is_success() {
            return Err(CacheError::PeerUnavailable(format!(
                "peer returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::MemoryDiscovery;

    const SELF_ADDR: &str = "http://127.0.0.1:9001";
    const OTHER_ADDR: &str = "http://127.0.0.1:9002";

    #[test]
    fn test_pick_peer_empty_pool() {
        let pool = HttpPool::new(SELF_ADDR);
        assert!(pool.pick_peer("any").is_none());
        assert!(pool.get_all().is_empty());
    }

    #[test]
    fn test_pick_peer_self_owned() {
        let pool = HttpPool::new(SELF_ADDR);
        pool.set_peers([SELF_ADDR]);

        // Every key is owned by this node.
        for i in 0..20 {
            assert!(pool.pick_peer(&format!("key{i}")).is_none());
        }
    }

    #[test]
    fn test_pick_peer_remote_owner() {
        let pool = HttpPool::new(SELF_ADDR);
        pool.set_peers([OTHER_ADDR]);

        // The only member is remote, so it owns everything.
        for i in 0..20 {
            assert!(pool.pick_peer(&format!("key{i}")).is_some());
        }
    }

    #[test]
    fn test_get_all_excludes_self() {
        let pool = HttpPool::new(SELF_ADDR);
        pool.set_peers([SELF_ADDR, OTHER_ADDR, "http://127.0.0.1:9003"]);

        assert_eq!(pool.get_all().len(), 2);
    }

    #[test]
    fn test_left_event_forgets_peer() {
        let pool = HttpPool::new(SELF_ADDR);
        pool.set_peers([SELF_ADDR, OTHER_ADDR]);

        pool.apply_event(PeerEvent::Left(OTHER_ADDR.to_string()));

        // The departed peer is gone from both the ring and the table.
        for i in 0..50 {
            assert!(pool.pick_peer(&format!("key{i}")).is_none());
        }
        assert!(pool.get_all().is_empty());
    }

    #[test]
    fn test_joined_event_adds_peer() {
        let pool = HttpPool::new(SELF_ADDR);
        pool.set_peers([SELF_ADDR]);

        pool.apply_event(PeerEvent::Joined(OTHER_ADDR.to_string()));

        let remote = (0..200).any(|i| pool.pick_peer(&format!("key{i}")).is_some());
        assert!(remote, "some keys must route to the new peer");
        assert_eq!(pool.get_all().len(), 1);
    }

    #[tokio::test]
    async fn test_set_registry_tracks_membership() {
        let registry = MemoryDiscovery::new();
        let pool = Arc::new(HttpPool::new(SELF_ADDR));

        registry.register(OTHER_ADDR).await.unwrap();
        let watch_task = pool
            .set_registry(Arc::new(registry.clone()))
            .await
            .unwrap();

        // Seeded from the listing: self plus the existing member.
        assert_eq!(pool.get_all().len(), 1);

        registry.deregister(OTHER_ADDR);
        tokio::task::yield_now().await;
        // Give the watch task a moment to drain the event.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert!(pool.get_all().is_empty());
        watch_task.abort();
    }

    #[test]
    fn test_client_url_encodes_segments() {
        let client = HttpClient::new(reqwest::Client::new(), OTHER_ADDR, DEFAULT_BASE_PATH);
        let url = client.url_for(&CacheRequest {
            group: "scores".to_string(),
            key: "a/b c".to_string(),
        });

        assert_eq!(
            url,
            "http://127.0.0.1:9002/_peercache/scores/a%2Fb%20c"
        );
    }
}
