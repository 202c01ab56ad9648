//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (strip hop-by-hop, Host, conditional headers)
//!     → Forward upstream
//!
//! Upstream response:
//!     → headers.rs (strip hop-by-hop)
//!     → Send to client
//! ```

pub mod headers;
