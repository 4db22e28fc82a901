//! Background Tasks Module
//!
//! Contains background tasks that run periodically during node operation.
//!
//! # Tasks
//! - Expiry sweep: purges expired entries from every group's caches

mod sweep;

pub use sweep::spawn_sweep_task;
