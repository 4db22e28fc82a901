//! Error types for the cache fleet
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Operational errors surfaced by groups, peers and the transport.
///
/// Cloneable so a single-flight leader can broadcast its outcome to every
/// waiter that joined the flight.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Get was called with an empty key
    #[error("key is required")]
    InvalidKey,

    /// Lookup against a group name that is not registered
    #[error("no such group: {0}")]
    UnknownGroup(String),

    /// The loader failed and negative caching is disabled
    #[error("loader failed: {0}")]
    Loader(String),

    /// A peer RPC failed
    #[error("peer unavailable: {0}")]
    PeerUnavailable(String),

    /// A peer responded with an expiry already in the past
    #[error("peer returned expired value")]
    PeerExpired,

    /// Discovery registration or subscription failed
    #[error("registry error: {0}")]
    Registry(String),

    /// At least one peer failed during remove fan-out; carries the last
    /// observed error
    #[error("remove fan-out failed: {0}")]
    RemoveFanout(String),
}

// == Config Error Enum ==
/// Construction-time misuse. These fail the call instead of panicking; they
/// never cross the HTTP boundary.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A group with this name already exists in the registry
    #[error("group already exists: {0}")]
    DuplicateGroup(String),

    /// register_peers was called more than once on the same group
    #[error("peer picker already registered")]
    PeersAlreadyRegistered,

    /// Hot cache configured with a non-positive byte budget
    #[error("hot cache size must be greater than zero")]
    InvalidHotCacheSize,
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidKey => StatusCode::BAD_REQUEST,
            CacheError::UnknownGroup(_) => StatusCode::NOT_FOUND,
            CacheError::Loader(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::PeerUnavailable(_) => StatusCode::BAD_GATEWAY,
            CacheError::PeerExpired => StatusCode::BAD_GATEWAY,
            CacheError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::RemoveFanout(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let cases = vec![
            (CacheError::InvalidKey, StatusCode::BAD_REQUEST),
            (
                CacheError::UnknownGroup("scores".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                CacheError::Loader("db down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CacheError::PeerUnavailable("connection refused".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (CacheError::PeerExpired, StatusCode::BAD_GATEWAY),
            (
                CacheError::Registry("endpoint unreachable".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let response = error.into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_error_is_cloneable() {
        let err = CacheError::Loader("boom".to_string());
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::DuplicateGroup("scores".to_string()).to_string(),
            "group already exists: scores"
        );
        assert_eq!(
            ConfigError::PeersAlreadyRegistered.to_string(),
            "peer picker already registered"
        );
    }
}
