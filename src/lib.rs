//! Peercache - a distributed in-memory key/value cache
//!
//! A fleet of peer nodes forms a single logical cache. Consistent hashing
//! assigns each key an owning node; misses run through a user-supplied
//! loader behind single-flight, and values fetched from other nodes land in
//! a small hot cache to absorb repeated cross-node reads.

pub mod api;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod group;
pub mod models;
pub mod peers;
pub mod pool;
pub mod ring;
pub mod singleflight;
pub mod tasks;
pub mod value;
pub mod wire;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{CacheError, ConfigError};
pub use group::{Group, GroupBuilder, GroupRegistry, Loader, LoaderFn};
pub use pool::HttpPool;
pub use tasks::spawn_sweep_task;
pub use value::ByteView;
