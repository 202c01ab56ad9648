//! Response capture for the cache.
//!
//! [`CaptureStream`] wraps the upstream body stream. Every chunk is passed to
//! the client untouched and, at the same time, written into an incremental
//! gzip decoder. When the upstream body ends and the decoder finishes
//! cleanly, the decompressed body is stored in the cache.
//!
//! When the upstream announced a `Content-Length`, capture completes as soon
//! as that many bytes have passed: the server stops polling a length-framed
//! body once the length is satisfied, so end-of-stream may never be seen.
//!
//! Capture never changes what the client sees. An empty body, non-gzip data,
//! a truncated stream, an upstream read error or a client disconnect simply
//! abandon the capture.

use bytes::Bytes;
use flate2::write::MultiGzDecoder;
use futures_util::{Stream, StreamExt};
use std::fmt::Display;
use std::io::Write;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use crate::cache::{CacheKey, FlightGuard, ResponseCache};
use crate::observability::metrics;

/// Tee of an upstream body into a gzip decoder feeding the cache.
pub struct CaptureStream<S> {
    inner: S,
    key: CacheKey,
    cache: ResponseCache,
    /// `None` once capture has been abandoned or completed.
    decoder: Option<MultiGzDecoder<Vec<u8>>>,
    bytes_seen: u64,
    /// Upstream `Content-Length`, when known.
    expected_len: Option<u64>,
    finished: bool,
    /// Held until capture ends so concurrent misses wait for this entry.
    flight: Option<FlightGuard>,
}

impl<S> CaptureStream<S> {
    pub fn new(inner: S, key: CacheKey, cache: ResponseCache, flight: Option<FlightGuard>) -> Self {
        Self {
            inner,
            key,
            cache,
            decoder: Some(MultiGzDecoder::new(Vec::new())),
            bytes_seen: 0,
            expected_len: None,
            finished: false,
            flight,
        }
    }

    /// Complete capture once `len` bytes have been seen.
    pub fn with_expected_len(mut self, len: Option<u64>) -> Self {
        self.expected_len = len;
        if len == Some(0) {
            self.complete();
        }
        self
    }

    fn feed(&mut self, chunk: &[u8]) {
        self.bytes_seen += chunk.len() as u64;

        let result = match self.decoder.as_mut() {
            Some(decoder) => decoder.write_all(chunk),
            None => return,
        };

        if let Err(e) = result {
            tracing::debug!(key = %self.key, error = %e, "Response is not gzip, skipping cache");
            metrics::record_cache_event("not_gzip");
            self.abandon();
        }
    }

    fn complete(&mut self) {
        self.finished = true;

        let Some(decoder) = self.decoder.take() else {
            self.flight.take();
            return;
        };

        if self.bytes_seen == 0 {
            tracing::debug!(key = %self.key, "Empty response body, skipping cache");
            metrics::record_cache_event("empty");
        } else {
            match decoder.finish() {
                Ok(body) => {
                    let size = body.len();
                    self.cache.store(self.key.clone(), Bytes::from(body));
                    metrics::record_cache_event("stored");
                    tracing::info!(key = %self.key, bytes = size, "Cache entry created");
                }
                Err(e) => {
                    tracing::debug!(key = %self.key, error = %e, "Incomplete gzip stream, skipping cache");
                    metrics::record_cache_event("not_gzip");
                }
            }
        }

        self.flight.take();
    }

    fn abandon(&mut self) {
        self.decoder = None;
        self.flight.take();
    }
}

impl<S, E> Stream for CaptureStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match ready!(this.inner.poll_next_unpin(cx)) {
            Some(Ok(chunk)) => {
                this.feed(&chunk);
                if this.expected_len == Some(this.bytes_seen) {
                    this.complete();
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                if this.decoder.is_some() {
                    tracing::warn!(key = %this.key, error = %e, "Upstream body error, skipping cache");
                    metrics::record_cache_event("upstream_error");
                }
                this.abandon();
                Poll::Ready(Some(Err(e)))
            }
            None => {
                this.complete();
                Poll::Ready(None)
            }
        }
    }
}

impl<S> Drop for CaptureStream<S> {
    fn drop(&mut self) {
        if !self.finished && self.decoder.is_some() {
            tracing::debug!(
                key = %self.key,
                bytes = self.bytes_seen,
                "Client went away before the body completed, skipping cache"
            );
            metrics::record_cache_event("aborted");
        }
    }
}
