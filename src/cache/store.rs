//! In-memory response cache with snapshot persistence.

use bytes::Bytes;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::flight::{FlightGroup, FlightGuard};
use crate::cache::key::CacheKey;
use crate::cache::snapshot::{self, Payload, Snapshot};
use crate::cache::CacheError;
use crate::config::CacheConfig;
use crate::observability::metrics;

/// Thread-safe cache of decompressed upstream response bodies.
///
/// Cloning is cheap; all clones share the same entries.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    entries: DashMap<CacheKey, Bytes>,
    /// `None` disables caching entirely.
    snapshot_path: Option<PathBuf>,
    /// Set by `store`, cleared by a successful flush.
    dirty: AtomicBool,
    flights: FlightGroup,
}

impl ResponseCache {
    /// Create an empty cache persisting to `snapshot_path`.
    pub fn new(snapshot_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                snapshot_path,
                dirty: AtomicBool::new(false),
                flights: FlightGroup::new(),
            }),
        }
    }

    /// Create a cache from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.snapshot_path())
    }

    /// True only when a cache directory was configured.
    pub fn enabled(&self) -> bool {
        self.inner.snapshot_path.is_some()
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.inner.snapshot_path.as_deref()
    }

    /// Look up a cached body.
    pub fn lookup(&self, key: &CacheKey) -> Option<Bytes> {
        self.inner.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Insert or overwrite the body stored under `key`.
    pub fn store(&self, key: CacheKey, body: Bytes) {
        self.inner.entries.insert(key, body);
        self.inner.dirty.store(true, Ordering::Release);
        metrics::record_cache_size(self.inner.entries.len());
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Whether entries were stored since the last successful flush.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::Acquire)
    }

    /// Claim the upstream fetch for `key`, waiting for any fetch already in
    /// flight for the same key.
    pub async fn begin_fetch(&self, key: &CacheKey) -> FlightGuard {
        self.inner.flights.acquire(key).await
    }

    /// Load entries from the snapshot file.
    ///
    /// A missing snapshot is not an error. Returns the number of entries loaded.
    pub fn load(&self) -> Result<usize, CacheError> {
        let Some(path) = self.snapshot_path() else {
            return Ok(0);
        };

        let Some(snapshot) = snapshot::read_snapshot(path)? else {
            tracing::debug!(path = %path.display(), "No cache snapshot found, starting empty");
            return Ok(0);
        };

        let count = snapshot.len();
        for (key, Payload(body)) in snapshot {
            self.inner.entries.insert(key, body);
        }
        metrics::record_cache_size(self.inner.entries.len());
        tracing::info!(path = %path.display(), entries = count, "Loaded cache snapshot");
        Ok(count)
    }

    /// Load the snapshot, logging and continuing empty on failure.
    pub fn load_or_empty(&self) -> usize {
        match self.load() {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load cache snapshot, starting with empty cache");
                0
            }
        }
    }

    /// Write every entry to the snapshot file, replacing it.
    ///
    /// Returns the number of entries written.
    pub fn save(&self) -> Result<usize, CacheError> {
        let Some(path) = self.snapshot_path() else {
            return Ok(0);
        };

        // Clear before copying so a store racing with this flush stays dirty.
        self.inner.dirty.store(false, Ordering::Release);

        let snapshot: Snapshot = self
            .inner
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), Payload(entry.value().clone())))
            .collect();

        if let Err(e) = snapshot::write_snapshot(path, &snapshot) {
            self.inner.dirty.store(true, Ordering::Release);
            return Err(e);
        }

        tracing::debug!(path = %path.display(), entries = snapshot.len(), "Saved cache snapshot");
        Ok(snapshot.len())
    }

    /// Save only if entries changed since the last flush.
    pub fn save_if_dirty(&self) -> Result<Option<usize>, CacheError> {
        if !self.is_dirty() {
            return Ok(None);
        }
        self.save().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_snapshot() -> PathBuf {
        std::env::temp_dir()
            .join(format!("cache-proxy-store-{}", uuid::Uuid::new_v4()))
            .join("cache.json")
    }

    #[test]
    fn test_cache_operations() {
        let cache = ResponseCache::new(Some(temp_snapshot()));
        let key = CacheKey::from("GET /data.json");

        assert!(cache.enabled());
        assert!(cache.lookup(&key).is_none());
        assert!(cache.is_empty());

        cache.store(key.clone(), Bytes::from_static(b"first"));
        assert_eq!(cache.lookup(&key).unwrap(), Bytes::from_static(b"first"));

        // Overwrite
        cache.store(key.clone(), Bytes::from_static(b"second"));
        assert_eq!(cache.lookup(&key).unwrap(), Bytes::from_static(b"second"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_absent_lookup_does_not_mutate() {
        let cache = ResponseCache::new(Some(temp_snapshot()));
        assert!(cache.lookup(&CacheKey::from("GET /missing")).is_none());
        assert!(cache.is_empty());
        assert!(!cache.is_dirty());
    }

    #[test]
    fn test_disabled_cache() {
        let cache = ResponseCache::new(None);
        assert!(!cache.enabled());
        assert_eq!(cache.load().unwrap(), 0);
        assert_eq!(cache.save().unwrap(), 0);
    }

    #[test]
    fn test_persistence() {
        let path = temp_snapshot();

        let cache = ResponseCache::new(Some(path.clone()));
        cache.store(CacheKey::from("GET /a"), Bytes::from_static(b"alpha"));
        cache.store(CacheKey::from("GET /b?x=1"), Bytes::from(vec![0u8, 159, 146, 150]));
        assert!(cache.is_dirty());
        assert_eq!(cache.save().unwrap(), 2);
        assert!(!cache.is_dirty());
        assert_eq!(cache.save_if_dirty().unwrap(), None);

        // Load new instance
        let loaded = ResponseCache::new(Some(path.clone()));
        assert_eq!(loaded.load().unwrap(), 2);
        assert_eq!(loaded.lookup(&CacheKey::from("GET /a")).unwrap(), Bytes::from_static(b"alpha"));
        assert_eq!(
            loaded.lookup(&CacheKey::from("GET /b?x=1")).unwrap(),
            Bytes::from(vec![0u8, 159, 146, 150])
        );

        // Cleanup
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).unwrap_or_default();
        }
    }

    #[test]
    fn test_corrupt_snapshot_loads_empty() {
        let path = temp_snapshot();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"garbage").unwrap();

        let cache = ResponseCache::new(Some(path.clone()));
        assert!(cache.load().is_err());
        assert_eq!(cache.load_or_empty(), 0);
        assert!(cache.is_empty());

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap_or_default();
    }
}
