//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → proxy.rs (cache check, single-flight)
//!     → rewrite.rs (upstream URL)
//!     → client.rs (upstream request)
//!     → capture.rs (tee body into gzip decoder → cache)
//!     → Send to client
//! ```

pub mod capture;
pub mod client;
pub mod error;
pub mod proxy;
pub mod request;
pub mod rewrite;
pub mod server;

pub use error::ProxyError;
pub use request::X_REQUEST_ID;
pub use rewrite::rewrite_request_url;
pub use server::{HttpServer, ServerError};
