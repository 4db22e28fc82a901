//! Discovery Module
//!
//! Service-discovery boundary for the peer router: register this node,
//! list the current membership, and watch a stream of join/leave events.
//! Production deployments plug in an adapter over their registry of choice;
//! [`MemoryDiscovery`] provides an in-process implementation for demos and
//! tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::Result;

/// Buffered membership events per watcher.
const EVENT_CHANNEL_SIZE: usize = 10;

// == Peer Event ==
/// A single membership change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// A peer joined under this address
    Joined(String),
    /// The peer at this address left
    Left(String),
}

// == Discovery Trait ==
/// Name registry watched by the peer router.
///
/// `register` is expected to keep the registration alive (lease renewal or
/// equivalent) for as long as the implementation lives. Dropping the
/// receiver returned by `watch` ends that subscription.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Publishes this node's address.
    async fn register(&self, addr: &str) -> Result<()>;

    /// Lists the currently registered addresses.
    async fn list(&self) -> Result<Vec<String>>;

    /// Subscribes to membership changes.
    async fn watch(&self) -> Result<mpsc::Receiver<PeerEvent>>;
}

// == Memory Discovery ==
/// In-process registry: all nodes share one handle and see each other's
/// registrations immediately.
#[derive(Debug, Clone, Default)]
pub struct MemoryDiscovery {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    addrs: BTreeSet<String>,
    watchers: Vec<mpsc::Sender<PeerEvent>>,
}

impl MemoryDiscovery {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Withdraws an address, notifying watchers. No-op if unknown.
    pub fn deregister(&self, addr: &str) {
        let mut state = self.inner.lock();
        if state.addrs.remove(addr) {
            Self::broadcast(&mut state, PeerEvent::Left(addr.to_string()));
        }
    }

    fn broadcast(state: &mut MemoryState, event: PeerEvent) {
        // Watchers whose receiver is gone are dropped from the list.
        state
            .watchers
            .retain(|watcher| watcher.try_send(event.clone()).is_ok());
    }
}

#[async_trait]
impl Discovery for MemoryDiscovery {
    async fn register(&self, addr: &str) -> Result<()> {
        let mut state = self.inner.lock();
        if state.addrs.insert(addr.to_string()) {
            Self::broadcast(&mut state, PeerEvent::Joined(addr.to_string()));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.inner.lock().addrs.iter().cloned().collect())
    }

    async fn watch(&self) -> Result<mpsc::Receiver<PeerEvent>> {
        let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_SIZE);
        self.inner.lock().watchers.push(sender);
        Ok(receiver)
    }
}
