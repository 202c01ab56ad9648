//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the cache snapshot inside the cache directory.
pub const SNAPSHOT_FILE_NAME: &str = "cache.json";

/// Root configuration for the caching proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream every request is forwarded to.
    pub upstream: UpstreamConfig,

    /// Response cache and snapshot persistence.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8888").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8888".to_string(),
        }
    }
}

/// Upstream target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream (e.g., "https://api.internal/v1").
    pub target_url: String,

    /// Accept any upstream TLS certificate.
    ///
    /// Only meant for trusted, pinned internal endpoints.
    pub insecure_skip_verify: bool,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            insecure_skip_verify: false,
            connect_timeout_secs: 10,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding `cache.json`. Caching is disabled when unset.
    pub dir: Option<PathBuf>,

    /// Interval between snapshot flushes in seconds.
    pub flush_interval_secs: u64,

    /// How long a miss waits for another in-flight fetch of the same key
    /// before going upstream on its own, in milliseconds.
    pub lock_timeout_ms: u64,
}

impl CacheConfig {
    /// Whether caching is enabled at all.
    pub fn enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Full path of the snapshot file, if caching is enabled.
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(SNAPSHOT_FILE_NAME))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            flush_interval_secs: 30,
            lock_timeout_ms: 3000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Verbose per-request logging.
    pub debug: bool,

    /// Prometheus exporter bind address. Metrics are not exported when unset.
    pub metrics_address: Option<String>,
}
