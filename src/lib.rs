//! Caching reverse proxy for a single upstream.
//!
//! Every inbound request is forwarded to one configured target. Successful
//! gzip-encoded GET responses are decompressed into an in-memory cache while
//! they stream to the client, and the cache is periodically persisted to
//! `<cache dir>/cache.json`.

// Core subsystems
pub mod cache;
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use cache::{CacheKey, ResponseCache};
pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
