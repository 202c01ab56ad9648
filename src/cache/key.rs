//! Cache key derivation.

use axum::http::{Method, Uri};
use serde::{Deserialize, Serialize};

/// Identifies a cached response: request method plus the full request URI
/// (path and query), e.g. `GET /assets/app.js?v=3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for an inbound request.
    pub fn from_request(method: &Method, uri: &Uri) -> Self {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        Self(format!("{} {}", method, path_and_query))
    }

    /// The key as stored in the snapshot.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CacheKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
