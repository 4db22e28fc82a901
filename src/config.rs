//! Configuration Module
//!
//! Handles loading and managing node configuration from environment
//! variables.

use std::env;

use crate::pool::DEFAULT_BASE_PATH;

/// Node configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Address this node advertises to its peers
    pub self_addr: String,
    /// Path prefix for peer cache traffic
    pub base_path: String,
    /// Main cache byte budget (0 = unbounded)
    pub cache_bytes: usize,
    /// Hot cache byte budget (0 = hot cache disabled)
    pub hot_cache_bytes: usize,
    /// Negative-cache TTL in seconds (0 = disabled)
    pub empty_key_ttl_secs: u64,
    /// Static peer addresses, including this node's own
    pub peers: Vec<String>,
    /// Expiry sweep interval in seconds
    pub sweep_interval_secs: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SELF_ADDR` - Advertised address (default: http://127.0.0.1:<port>)
    /// - `BASE_PATH` - Peer traffic path prefix (default: /_peercache/)
    /// - `CACHE_BYTES` - Main cache budget in bytes (default: 8 MiB)
    /// - `HOT_CACHE_BYTES` - Hot cache budget in bytes (default: 0, disabled)
    /// - `EMPTY_KEY_TTL_SECS` - Negative-cache TTL (default: 0, disabled)
    /// - `PEERS` - Comma-separated peer addresses (default: empty)
    /// - `SWEEP_INTERVAL_SECS` - Sweep frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);
        Self {
            server_port,
            self_addr: env::var("SELF_ADDR")
                .unwrap_or_else(|_| format!("http://127.0.0.1:{server_port}")),
            base_path: env::var("BASE_PATH").unwrap_or_else(|_| DEFAULT_BASE_PATH.to_string()),
            cache_bytes: env::var("CACHE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8 << 20),
            hot_cache_bytes: env::var("HOT_CACHE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            empty_key_ttl_secs: env::var("EMPTY_KEY_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            peers: env::var("PEERS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|addr| !addr.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            self_addr: "http://127.0.0.1:3000".to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            cache_bytes: 8 << 20,
            hot_cache_bytes: 0,
            empty_key_ttl_secs: 0,
            peers: Vec::new(),
            sweep_interval_secs: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.self_addr, "http://127.0.0.1:3000");
        assert_eq!(config.base_path, "/_peercache/");
        assert_eq!(config.cache_bytes, 8 << 20);
        assert_eq!(config.hot_cache_bytes, 0);
        assert!(config.peers.is_empty());
        assert_eq!(config.sweep_interval_secs, 1);
    }

    #[test]
    fn test_config_peer_list_parsing() {
        let parse = |raw: &str| -> Vec<String> {
            raw.split(',')
                .map(str::trim)
                .filter(|addr| !addr.is_empty())
                .map(str::to_string)
                .collect()
        };

        assert_eq!(
            parse("http://a:1, http://b:2 ,,http://c:3"),
            vec![
                "http://a:1".to_string(),
                "http://b:2".to_string(),
                "http://c:3".to_string(),
            ]
        );
    }
}
