//! API Handlers
//!
//! HTTP request handlers for peer cache traffic and the observability
//! endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use prost::Message;
use serde_json::json;

use crate::error::{CacheError, Result};
use crate::group::GroupRegistry;
use crate::models::{HealthResponse, StatsResponse};
use crate::wire::CacheResponse;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The node's group registry
    pub groups: Arc<GroupRegistry>,
}

impl AppState {
    /// Creates a new AppState over the given registry.
    pub fn new(groups: Arc<GroupRegistry>) -> Self {
        Self { groups }
    }
}

/// Handler for `GET <base>/:group/:key`
///
/// Looks the key up in the named group and returns the protobuf-encoded
/// value. 404 if the group is unknown, 500 if the loader fails.
pub async fn fetch_value(
    State(state): State<AppState>,
    Path((group_name, key)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let group = state
        .groups
        .get(&group_name)
        .ok_or(CacheError::UnknownGroup(group_name))?;

    let view = group.get(&key).await?;
    let body = CacheResponse {
        value: view.to_vec(),
        expire: view.expire_unix_nanos(),
    }
    .encode_to_vec();

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        body,
    ))
}

/// Handler for `DELETE <base>/:group/:key`
///
/// Drops the key from this node's caches only; cluster-wide removal is the
/// calling peer's fan-out.
pub async fn remove_value(
    State(state): State<AppState>,
    Path((group_name, key)): Path<(String, String)>,
) -> Result<StatusCode> {
    let group = state
        .groups
        .get(&group_name)
        .ok_or(CacheError::UnknownGroup(group_name))?;

    group.remove_locally(&key);
    Ok(StatusCode::OK)
}

/// Fallback for malformed paths under the peer base path.
pub async fn bad_request() -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "bad request" })),
    )
}

/// Handler for `GET /stats`
///
/// Returns per-group cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state
        .groups
        .groups()
        .iter()
        .map(|group| group.stats())
        .collect();
    Json(StatsResponse::new(stats))
}

/// Handler for `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
