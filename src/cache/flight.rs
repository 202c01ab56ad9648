//! Single-flight admission for cache misses.
//!
//! Concurrent misses for the same key queue on a per-key async mutex. The
//! first requester (the leader) fetches from upstream and holds its
//! [`FlightGuard`] until the capture has finished or been abandoned. The
//! others wake up one at a time, re-check the cache and only go upstream if
//! the leader did not produce an entry.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::cache::key::CacheKey;

/// Per-key locks for in-flight upstream fetches.
#[derive(Debug, Default)]
pub struct FlightGroup {
    flights: Arc<DashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl FlightGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other fetch for `key` is in flight, then claim it.
    pub async fn acquire(&self, key: &CacheKey) -> FlightGuard {
        let lock = self
            .flights
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = lock.lock_owned().await;

        FlightGuard {
            key: key.clone(),
            guard: Some(guard),
            flights: Arc::clone(&self.flights),
        }
    }

    /// Number of keys with a fetch in flight or queued.
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }
}

/// Exclusive right to fetch one key from upstream. Released on drop.
#[derive(Debug)]
pub struct FlightGuard {
    key: CacheKey,
    guard: Option<OwnedMutexGuard<()>>,
    flights: Arc<DashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        // Unlock first so the strong count only reflects the map and waiters.
        drop(self.guard.take());
        self.flights
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
