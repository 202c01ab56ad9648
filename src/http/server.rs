//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Load the cache snapshot and start the cache flusher
//! - Serve until shutdown, then wait for the final cache flush

use axum::{routing::any, Router};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::cache::{CacheFlusher, ResponseCache};
use crate::config::validation::{parse_target_url, ValidationError};
use crate::config::ProxyConfig;
use crate::http::client::build_client;
use crate::http::proxy::{proxy_handler, AppState};
use crate::http::request::MakeRequestUuid;

/// Errors constructing the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid upstream target: {0}")]
    Target(#[from] ValidationError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP server for the caching proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    cache: ResponseCache,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let target = Arc::new(parse_target_url(&config.upstream.target_url)?);
        let client = build_client(&config.upstream)?;
        let cache = ResponseCache::from_config(&config.cache);

        let state = AppState {
            target,
            client,
            cache: cache.clone(),
            lock_timeout: Duration::from_millis(config.cache.lock_timeout_ms),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            cache,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server on `listener` until `shutdown` fires.
    ///
    /// Loads the cache snapshot first; returns after the final cache flush.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;

        let flusher = if self.cache.enabled() {
            let cache = self.cache.clone();
            let loaded = tokio::task::spawn_blocking(move || cache.load_or_empty())
                .await
                .unwrap_or_default();
            tracing::info!(entries = loaded, path = ?self.cache.snapshot_path(), "Response cache enabled");

            let flusher = CacheFlusher::new(
                self.cache.clone(),
                Duration::from_secs(self.config.cache.flush_interval_secs),
            );
            Some(tokio::spawn(flusher.run(shutdown.resubscribe())))
        } else {
            tracing::info!("Response cache disabled");
            None
        };

        tracing::info!(
            address = %addr,
            target = %self.config.upstream.target_url,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");

        if let Some(handle) = flusher {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Cache flusher task failed");
            }
        }

        Ok(())
    }

    /// The shared response cache.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }
}
