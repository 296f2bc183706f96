//! Background expiry sweep for temporary sites.
//!
//! # Responsibilities
//! - Periodically evict non-premium sites past their TTL
//! - Reclaim the evicted sites' on-disk storage
//!
//! # Design Decisions
//! - The registry lock is held only for the in-memory scan; directory
//!   deletion happens after it is released

use std::sync::Arc;
use std::time::Duration;

use crate::site::store::SiteStore;

/// Evicts expired temporary sites on a fixed interval.
pub struct ExpirySweeper {
    store: Arc<SiteStore>,
    ttl: Duration,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(store: Arc<SiteStore>, ttl: Duration, interval: Duration) -> Self {
        Self {
            store,
            ttl,
            interval,
        }
    }

    /// Run the sweep loop forever. Spawn on a dedicated task.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        // the first tick completes immediately; skip it
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.sweep_once();
        }
    }

    /// One sweep pass: evict, then delete directories outside the lock.
    pub fn sweep_once(&self) {
        let evicted = self.store.sweep_expired(self.ttl);
        if evicted.is_empty() {
            return;
        }
        for (name, dir) in evicted {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {
                    tracing::info!(site = %name, dir = %dir.display(), "Expired site removed")
                }
                Err(err) => {
                    tracing::warn!(
                        site = %name,
                        dir = %dir.display(),
                        error = %err,
                        "Failed to remove expired site directory"
                    )
                }
            }
        }
    }
}
