//! The proxy handler: the single entry point for every inbound request.
//!
//! # Request State Machine
//! ```text
//! Receive (derive cache key)
//!     → [GET + cache enabled] lookup → hit: serve cached body
//!                                    → miss: wait (bounded) for single-flight slot, re-check
//!     → Rewrite URL, strip Host / conditional / hop-by-hop headers
//!     → Forward upstream (same method, headers, streamed body)
//!     → Mirror status + headers
//!     → Body: plain stream, or tee through gzip capture into the cache
//! ```
//!
//! # Cache Hit Policy
//! A hit answers `200` with the stored *decompressed* body and no
//! `Content-Encoding` header. A miss answers with the upstream bytes and
//! headers exactly as received. A hit carries no `Content-Type`: only the
//! body is cached, never the upstream headers.
//!
//! # Single-flight Wait
//! A miss waits at most `lock_timeout` for another fetch of the same key.
//! The leader's guard is only released once its client has read the body,
//! so a stalled client must not hold everyone else. On timeout the request
//! goes upstream without the guard and still captures its response.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, Request},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::cache::{CacheKey, FlightGuard, ResponseCache};
use crate::http::capture::CaptureStream;
use crate::http::error::ProxyError;
use crate::http::request::request_id;
use crate::http::rewrite::rewrite_request_url;
use crate::observability::metrics;
use crate::security::headers::{sanitize_request_headers, sanitize_response_headers};

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    /// Parsed upstream base URL.
    pub target: Arc<Url>,
    pub client: reqwest::Client,
    pub cache: ResponseCache,
    /// Upper bound on waiting for another in-flight fetch of the same key.
    pub lock_timeout: Duration,
}

/// How a request interacted with the cache, used as a metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheOutcome {
    Hit,
    Miss,
    Bypass,
}

impl CacheOutcome {
    fn as_str(self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Bypass => "bypass",
        }
    }
}

/// Main proxy handler.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let request_id = request_id(request.headers()).to_string();
    let key = CacheKey::from_request(&method, request.uri());

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        uri = %request.uri(),
        headers = ?request.headers(),
        "Proxying request"
    );

    // 1. Cache check (GET only)
    let mut flight = None;
    let outcome = if method == Method::GET && state.cache.enabled() {
        if let Some(body) = state.cache.lookup(&key) {
            return serve_hit(&request_id, &method, key, body, start_time);
        }

        // Wait for any in-flight fetch of this key, then look again.
        match tokio::time::timeout(state.lock_timeout, state.cache.begin_fetch(&key)).await {
            Ok(guard) => flight = Some(guard),
            Err(_) => {
                tracing::warn!(
                    request_id = %request_id,
                    key = %key,
                    timeout_ms = state.lock_timeout.as_millis() as u64,
                    "Timed out waiting for in-flight fetch, going upstream"
                );
                metrics::record_cache_event("lock_timeout");
            }
        }
        if let Some(body) = state.cache.lookup(&key) {
            return serve_hit(&request_id, &method, key, body, start_time);
        }

        tracing::debug!(request_id = %request_id, key = %key, cached = state.cache.len(), "Cache miss");
        CacheOutcome::Miss
    } else {
        CacheOutcome::Bypass
    };

    // 2. Forward
    let capture = outcome == CacheOutcome::Miss;
    let response = match forward(&state, request, key, capture, flight).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e.describe(), "Upstream error");
            e.into_response()
        }
    };

    tracing::debug!(
        request_id = %request_id,
        status = %response.status(),
        headers = ?response.headers(),
        "Upstream responded"
    );

    metrics::record_request(method.as_str(), response.status().as_u16(), outcome.as_str(), start_time);
    response
}

fn serve_hit(request_id: &str, method: &Method, key: CacheKey, body: Bytes, start_time: Instant) -> Response {
    tracing::info!(request_id = %request_id, key = %key, bytes = body.len(), "Cache hit");
    let response = Response::new(Body::from(body));
    metrics::record_request(method.as_str(), response.status().as_u16(), CacheOutcome::Hit.as_str(), start_time);
    response
}

/// Send `request` upstream and build the client response.
///
/// With `capture`, a successful response body is captured into the cache
/// while it streams to the client. `flight` is held until capture ends.
async fn forward(
    state: &AppState,
    request: Request<Body>,
    key: CacheKey,
    capture: bool,
    flight: Option<FlightGuard>,
) -> Result<Response, ProxyError> {
    let url = rewrite_request_url(request.uri(), &state.target)?;
    let (parts, body) = request.into_parts();

    let mut headers = parts.headers;
    let has_body = has_request_body(&headers);
    sanitize_request_headers(&mut headers);

    let mut outbound = state.client.request(parts.method, url).headers(headers);
    if has_body {
        outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let upstream = outbound.send().await?;
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    sanitize_response_headers(&mut headers);

    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let stream = upstream.bytes_stream();
    let body = if capture && status.is_success() {
        Body::from_stream(
            CaptureStream::new(Box::pin(stream), key, state.cache.clone(), flight)
                .with_expected_len(content_length),
        )
    } else {
        Body::from_stream(stream)
    };

    let mut builder = Response::builder().status(status);
    if let Some(response_headers) = builder.headers_mut() {
        response_headers.extend(headers);
    }
    Ok(builder.body(body)?)
}

/// Whether the inbound request carries a body worth streaming upstream.
fn has_request_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}
