//! Peer Abstraction Module
//!
//! Traits connecting a group to the rest of the fleet: a client for talking
//! to one remote peer, and a picker answering "who owns this key?".

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::wire::{CacheRequest, CacheResponse};

// == Peer Client ==
/// Client handle for a single remote peer.
///
/// Implementations are owned by the peer router, shared across threads, and
/// must not retain request buffers after a call returns.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Fetches the value for `request` from the peer.
    async fn fetch(&self, request: &CacheRequest) -> Result<CacheResponse>;

    /// Removes the value for `request` from the peer.
    async fn remove(&self, request: &CacheRequest) -> Result<()>;
}

// == Peer Picker ==
/// Routes keys to the peer clients that own them.
pub trait PeerPicker: Send + Sync {
    /// Returns the client for the peer owning `key`, or `None` when the key
    /// belongs to this node (or no peers are known) and must be handled
    /// locally.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerClient>>;

    /// Returns every peer client except this node's own, in no particular
    /// order. Used for remove fan-out.
    fn get_all(&self) -> Vec<Arc<dyn PeerClient>>;
}
