//! Peercache node binary
//!
//! Starts one cache node serving a demo "scores" group: peers resolve key
//! ownership over the consistent-hash ring, and misses on owned keys fall
//! through to a slow in-memory origin.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use peercache::{
    create_router, spawn_sweep_task, AppState, ByteView, CacheError, Config, GroupBuilder,
    GroupRegistry, HttpPool, LoaderFn,
};

/// Main entry point for a cache node.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the group registry and the demo group
/// 4. Wire the peer pool (static membership from `PEERS`)
/// 5. Start the background expiry sweep task
/// 6. Start the HTTP server on the configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peercache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting peercache node");

    let config = Config::from_env();
    info!(
        self_addr = %config.self_addr,
        port = config.server_port,
        cache_bytes = config.cache_bytes,
        peers = config.peers.len(),
        "Configuration loaded"
    );

    let registry = Arc::new(GroupRegistry::new());
    let group = build_scores_group(&registry, &config);

    let pool = Arc::new(HttpPool::with_base_path(
        config.self_addr.clone(),
        config.base_path.clone(),
    ));
    if !config.peers.is_empty() {
        pool.set_peers(config.peers.clone());
    }
    group
        .register_peers(pool)
        .expect("peers are registered exactly once at startup");

    let sweep_handle = spawn_sweep_task(Arc::clone(&registry), config.sweep_interval_secs);
    info!("Background expiry sweep started");

    let app = create_router(AppState::new(registry), &config.base_path);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    info!("Node listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweep_handle))
        .await
        .unwrap();

    info!("Node shutdown complete");
}

/// Builds the demo group backed by a slow in-memory origin.
fn build_scores_group(
    registry: &GroupRegistry,
    config: &Config,
) -> Arc<peercache::Group> {
    let loader = LoaderFn(|key: String| async move {
        info!(key, "[SlowDB] loading");
        tokio::time::sleep(Duration::from_millis(10)).await;
        let table = [("Tom", "630"), ("Jack", "589"), ("Sam", "567")];
        match table.iter().find(|(name, _)| *name == key) {
            Some((_, score)) => Ok(ByteView::with_ttl(
                score.as_bytes().to_vec(),
                Duration::from_secs(60),
            )),
            None => Err(CacheError::Loader(format!("{key} does not exist"))),
        }
    });

    let mut builder = GroupBuilder::new("scores", config.cache_bytes, loader);
    if config.hot_cache_bytes > 0 {
        builder = builder.hot_cache_bytes(config.hot_cache_bytes);
    }
    if config.empty_key_ttl_secs > 0 {
        builder = builder.empty_key_ttl(Duration::from_secs(config.empty_key_ttl_secs));
    }
    builder
        .build(registry)
        .expect("fresh registry holds no duplicate groups")
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the sweep task and allows graceful shutdown.
async fn shutdown_signal(sweep_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    sweep_handle.abort();
    warn!("Sweep task aborted");
}
