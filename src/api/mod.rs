//! API Module
//!
//! HTTP surface of a node: the peer cache protocol plus observability.
//!
//! # Endpoints
//! - `GET <base>/:group/:key` - Fetch a value (protobuf body)
//! - `DELETE <base>/:group/:key` - Drop a value from this node
//! - `GET /stats` - Per-group cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
