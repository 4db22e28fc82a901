//! Response models for the observability endpoints
//!
//! The peer protocol itself speaks protobuf (see [`crate::wire`]); these
//! DTOs only shape the JSON bodies of `/stats` and `/health`.

pub mod responses;

pub use responses::{CacheStatsBody, GroupStatsResponse, HealthResponse, StatsResponse};
