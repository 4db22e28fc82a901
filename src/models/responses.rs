//! Response DTOs for the observability endpoints
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::group::GroupStats;

/// Statistics for one cache inside a group.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsBody {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of evictions (budget or TTL)
    pub evictions: u64,
    /// Current number of entries
    pub entries: usize,
    /// Bytes accounted against the budget
    pub used_bytes: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for CacheStatsBody {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            entries: stats.total_entries,
            used_bytes: stats.used_bytes,
        }
    }
}

/// Statistics for one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupStatsResponse {
    /// Group name
    pub name: String,
    /// Main cache statistics
    pub main: CacheStatsBody,
    /// Hot cache statistics, when the hot cache is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot: Option<CacheStatsBody>,
}

impl From<GroupStats> for GroupStatsResponse {
    fn from(stats: GroupStats) -> Self {
        Self {
            name: stats.name,
            main: stats.main.into(),
            hot: stats.hot.map(Into::into),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// One entry per registered group
    pub groups: Vec<GroupStatsResponse>,
}

impl StatsResponse {
    /// Creates a new StatsResponse from group snapshots.
    pub fn new(stats: Vec<GroupStats>) -> Self {
        Self {
            groups: stats.into_iter().map(Into::into).collect(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp.
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
