//! Cluster Integration Tests
//!
//! Boots several real nodes on loopback listeners and exercises the
//! cross-node paths: peer-routed reads with hot-cache cross-fill,
//! single-flight collapse through a group, and remove fan-out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use peercache::peers::PeerPicker;
use peercache::{
    create_router, AppState, ByteView, CacheError, Group, GroupBuilder, GroupRegistry, HttpPool,
    LoaderFn,
};

// == Test Cluster ==

struct Node {
    addr: String,
    group: Arc<Group>,
    pool: Arc<HttpPool>,
    loads: Arc<AtomicUsize>,
    server: JoinHandle<()>,
}

impl Node {
    /// First probe key this node owns according to its own ring.
    fn owned_key(&self) -> String {
        (0..10_000)
            .map(|i| format!("key{i}"))
            .find(|key| self.pool.pick_peer(key).is_none())
            .expect("some probe key is owned by this node")
    }

    /// First probe key this node routes to a remote peer.
    fn remote_key(&self) -> String {
        (0..10_000)
            .map(|i| format!("key{i}"))
            .find(|key| self.pool.pick_peer(key).is_some())
            .expect("some probe key is owned by a remote peer")
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Starts one node serving the "scores" group behind `listener`, with the
/// given cluster membership.
async fn start_node(listener: TcpListener, addr: String, members: Vec<String>) -> Node {
    let loads = Arc::new(AtomicUsize::new(0));
    let loader = {
        let loads = Arc::clone(&loads);
        LoaderFn(move |key: String| {
            let loads = Arc::clone(&loads);
            async move {
                loads.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(ByteView::new(format!("origin-{key}").into_bytes()))
            }
        })
    };

    let registry = Arc::new(GroupRegistry::new());
    let group = GroupBuilder::new("scores", 1 << 20, loader)
        .hot_cache_bytes(1 << 16)
        .build(&registry)
        .unwrap();

    let pool = Arc::new(HttpPool::new(addr.clone()));
    pool.set_peers(members);
    group
        .register_peers(Arc::clone(&pool) as Arc<dyn PeerPicker>)
        .unwrap();

    let app = create_router(AppState::new(registry), pool.base_path());
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Node {
        addr,
        group,
        pool,
        loads,
        server,
    }
}

/// Binds `n` loopback listeners and starts a node on each, every node
/// knowing the full membership.
async fn start_cluster(n: usize) -> Vec<Node> {
    let mut listeners = Vec::new();
    let mut members = Vec::new();
    for _ in 0..n {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        members.push(format!("http://{}", listener.local_addr().unwrap()));
        listeners.push(listener);
    }

    let mut nodes = Vec::new();
    for (listener, addr) in listeners.into_iter().zip(members.iter()) {
        nodes.push(start_node(listener, addr.clone(), members.clone()).await);
    }
    nodes
}

// == Scenarios ==

#[tokio::test]
async fn test_remote_read_cross_fills_hot_cache() {
    let nodes = start_cluster(2).await;
    let key = nodes[0].remote_key();

    // The RPC lands on the owner, whose loader runs once.
    let value = nodes[0].group.get(&key).await.unwrap();
    assert_eq!(value.to_string(), format!("origin-{key}"));
    assert_eq!(nodes[0].loads.load(Ordering::SeqCst), 0);
    assert_eq!(nodes[1].loads.load(Ordering::SeqCst), 1);

    // The second read is absorbed by the hot cache: no further RPC, no
    // further load anywhere.
    let value = nodes[0].group.get(&key).await.unwrap();
    assert_eq!(value.to_string(), format!("origin-{key}"));
    assert_eq!(nodes[1].loads.load(Ordering::SeqCst), 1);
    assert_eq!(nodes[0].group.stats().hot.unwrap().total_entries, 1);
}

#[tokio::test]
async fn test_owned_read_stays_local() {
    let nodes = start_cluster(2).await;
    let key = nodes[0].owned_key();

    let value = nodes[0].group.get(&key).await.unwrap();
    assert_eq!(value.to_string(), format!("origin-{key}"));
    assert_eq!(nodes[0].loads.load(Ordering::SeqCst), 1);
    assert_eq!(nodes[1].loads.load(Ordering::SeqCst), 0);
    assert_eq!(nodes[0].group.stats().main.total_entries, 1);
}

#[tokio::test]
async fn test_concurrent_remote_reads_collapse() {
    let nodes = start_cluster(2).await;
    let key = nodes[0].remote_key();

    let reads = futures::future::join_all(
        (0..50).map(|_| nodes[0].group.get(&key)),
    )
    .await;

    for read in reads {
        assert_eq!(read.unwrap().to_string(), format!("origin-{key}"));
    }
    // Single flight on the caller collapses to one RPC, and single flight
    // on the owner collapses to one origin load.
    assert_eq!(nodes[1].loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_remove_reaches_the_owner() {
    let nodes = start_cluster(2).await;
    let key = nodes[0].remote_key();

    // Warm the owner's main cache and the caller's hot cache.
    nodes[0].group.get(&key).await.unwrap();
    assert_eq!(nodes[1].group.stats().main.total_entries, 1);

    nodes[0].group.remove(&key).await.unwrap();

    // Both copies are gone; the next read loads from the origin again.
    assert_eq!(nodes[1].group.stats().main.total_entries, 0);
    assert_eq!(nodes[0].group.stats().hot.unwrap().total_entries, 0);
    nodes[0].group.get(&key).await.unwrap();
    assert_eq!(nodes[1].loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_remove_fanout_reports_dead_peer() {
    // Two live nodes plus one member address nobody listens on.
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = format!("http://{}", dead.local_addr().unwrap());
    drop(dead);

    let l1 = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let l2 = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr1 = format!("http://{}", l1.local_addr().unwrap());
    let addr2 = format!("http://{}", l2.local_addr().unwrap());
    let members = vec![addr1.clone(), addr2.clone(), dead_addr];

    let node_a = start_node(l1, addr1, members.clone()).await;
    let _node_b = start_node(l2, addr2, members).await;

    // Work on a key this node owns, so the delete fans out to the other
    // two members, one of which is unreachable.
    let key = node_a.owned_key();
    node_a.group.get(&key).await.unwrap();

    let err = node_a.group.remove(&key).await.unwrap_err();
    assert!(matches!(err, CacheError::RemoveFanout(_)));

    // The local copy was dropped even though the fan-out failed.
    assert_eq!(node_a.group.stats().main.total_entries, 0);
}

#[tokio::test]
async fn test_peer_loss_falls_back_to_local_load() {
    let nodes = start_cluster(2).await;
    let key = nodes[0].remote_key();

    // Take the owner down; its address is still in the ring.
    nodes[1].server.abort();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let value = nodes[0].group.get(&key).await.unwrap();
    assert_eq!(value.to_string(), format!("origin-{key}"));
    assert_eq!(nodes[0].loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_nodes_agree_on_ownership() {
    let nodes = start_cluster(3).await;

    for i in 0..100 {
        let key = format!("key{i}");
        let owners: Vec<bool> = nodes
            .iter()
            .map(|node| node.pool.pick_peer(&key).is_none())
            .collect();
        assert_eq!(
            owners.iter().filter(|owned| **owned).count(),
            1,
            "exactly one node must own {key} (from {})",
            nodes[0].addr
        );
    }
}
