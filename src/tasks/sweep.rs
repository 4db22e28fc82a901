//! Expiry Sweep Task
//!
//! Background task that periodically purges expired entries from every
//! registered group. The per-operation sweeps inside the caches already
//! keep expired entries away from callers; this task reclaims the memory
//! of keys nobody touches.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::group::GroupRegistry;

/// Spawns a task purging expired entries at a fixed interval.
///
/// Returns the task's JoinHandle, which can be used to abort it during
/// graceful shutdown.
pub fn spawn_sweep_task(registry: Arc<GroupRegistry>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(interval_secs, "starting expiry sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let mut removed = 0;
            for group in registry.groups() {
                removed += group.sweep();
            }

            if removed > 0 {
                info!(removed, "expiry sweep removed entries");
            } else {
                debug!("expiry sweep found no expired entries");
            }
        }
    })
}
