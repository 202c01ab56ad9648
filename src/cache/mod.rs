//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     cache.json → snapshot.rs (JSON + base64) → store.rs (DashMap)
//!
//! Request path (GET, cache enabled):
//!     key.rs (method + URI) → store.rs lookup
//!     → miss: flight.rs (one upstream fetch per key)
//!     → http capture stores the decompressed body
//!
//! Background:
//!     flusher.rs (every flush interval, and once at shutdown)
//!     → store.rs save → snapshot.rs (temp file + rename)
//! ```
//!
//! # Design Decisions
//! - Entries are never evicted; they live until restart
//! - Writes never touch disk; the flusher bounds I/O cost
//! - A crash loses entries stored since the last flush

pub mod flight;
pub mod flusher;
pub mod key;
pub mod snapshot;
pub mod store;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use flight::{FlightGroup, FlightGuard};
pub use flusher::CacheFlusher;
pub use key::CacheKey;
pub use store::ResponseCache;

/// Errors from loading or saving the cache snapshot.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the snapshot file failed.
    #[error("snapshot I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be encoded or decoded.
    #[error("snapshot format error at {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json { path: path.to_path_buf(), source }
    }
}
