//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Pick the default filter from the `debug` setting
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` always wins over the built-in defaults

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directives.
pub fn default_directives(debug: bool) -> &'static str {
    if debug {
        "cache_proxy=debug,tower_http=debug"
    } else {
        "cache_proxy=info,tower_http=info"
    }
}

/// Install the global tracing subscriber.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(debug).into());

    // A subscriber may already be installed (tests, embedding).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
