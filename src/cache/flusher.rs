//! Periodic cache persistence.
//!
//! # Responsibilities
//! - Flush the cache to its snapshot on a fixed interval
//! - Flush one last time when shutdown is signalled
//! - Keep disk I/O off the async worker threads

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::cache::store::ResponseCache;
use crate::observability::metrics;

/// Background task that writes the cache snapshot.
pub struct CacheFlusher {
    cache: ResponseCache,
    interval: Duration,
}

impl CacheFlusher {
    pub fn new(cache: ResponseCache, interval: Duration) -> Self {
        Self { cache, interval }
    }

    /// Run until `shutdown` fires, then perform a final flush.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.cache.enabled() {
            tracing::info!("Cache persistence disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            path = ?self.cache.snapshot_path(),
            "Cache flusher starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache flusher received shutdown signal, flushing");
                    self.flush().await;
                    break;
                }
            }
        }
    }

    /// Save the cache if it changed since the last flush.
    pub async fn flush(&self) {
        let cache = self.cache.clone();
        let result = tokio::task::spawn_blocking(move || cache.save_if_dirty()).await;

        match result {
            Ok(Ok(Some(entries))) => {
                metrics::record_cache_flush("ok");
                tracing::debug!(entries, "Cache saved");
            }
            Ok(Ok(None)) => {
                tracing::trace!("Cache unchanged, skipping flush");
            }
            Ok(Err(e)) => {
                metrics::record_cache_flush("error");
                tracing::error!(error = %e, "Error saving cache");
            }
            Err(e) => {
                metrics::record_cache_flush("error");
                tracing::error!(error = %e, "Cache flush task failed");
            }
        }
    }
}
