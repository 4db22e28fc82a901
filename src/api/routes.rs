//! API Routes
//!
//! Configures the Axum router: peer cache traffic under the configurable
//! base path, observability endpoints at the root.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    bad_request, fetch_value, health_handler, remove_value, stats_handler, AppState,
};

/// Creates the node's router.
///
/// # Endpoints
/// - `GET <base>/:group/:key` - Fetch a value (protobuf body)
/// - `DELETE <base>/:group/:key` - Drop a value from this node
/// - `GET /stats` - Per-group cache statistics
/// - `GET /health` - Health check endpoint
///
/// Anything else under `base` answers 400. `base` must start with `/`.
pub fn create_router(state: AppState, base_path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let peer_routes = Router::new()
        .route("/:group/:key", get(fetch_value).delete(remove_value))
        .fallback(bad_request);

    Router::new()
        .nest(base_path.trim_end_matches('/'), peer_routes)
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
