//! Caching Reverse Proxy
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                  CACHING PROXY                   │
//!   Client Request    │  ┌─────────┐   ┌──────────┐   ┌──────────────┐   │
//!   ──────────────────┼─▶│  http   │──▶│  proxy   │──▶│   rewrite    │───┼──▶ Upstream
//!                     │  │ server  │   │ handler  │   │  + client    │   │
//!                     │  └─────────┘   └────┬─────┘   └──────┬───────┘   │
//!                     │                     │ GET            │ body      │
//!                     │                     ▼                ▼           │
//!   Client Response   │              ┌──────────────┐  ┌───────────┐     │
//!   ◀─────────────────┼──────────────│    cache     │◀─│  capture  │◀────┼─── Upstream
//!                     │              │ (DashMap)    │  │  (gzip)   │     │
//!                     │              └──────┬───────┘  └───────────┘     │
//!                     │                     │ every 30s                  │
//!                     │                     ▼                            │
//!                     │              cache.json snapshot                 │
//!                     └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use cache_proxy::config::load_config;
use cache_proxy::http::HttpServer;
use cache_proxy::lifecycle::{signals, Shutdown};
use cache_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "cache-proxy")]
#[command(about = "Caching reverse proxy for a single upstream", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init(false);
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    logging::init(config.observability.debug);

    tracing::info!(
        target_url = %config.upstream.target_url,
        bind_address = %config.listener.bind_address,
        cache_dir = ?config.cache.dir,
        insecure_skip_verify = config.upstream.insecure_skip_verify,
        "cache-proxy v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if let Some(addr) = &config.observability.metrics_address {
        match addr.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(metrics_address = %addr, "Failed to parse metrics address"),
        }
    }

    // Bind TCP listener
    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_on_signal(&shutdown).await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
