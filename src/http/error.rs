//! Per-request proxy errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::error::Error as StdError;
use thiserror::Error;

use crate::http::rewrite::RewriteError;

/// Failures surfaced to the client as a plain-text error response.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The request could not be mapped onto the upstream URL.
    #[error("invalid upstream URL: {0}")]
    Rewrite(#[from] RewriteError),

    /// The upstream did not answer in time.
    #[error("upstream request timed out")]
    UpstreamTimeout(#[source] reqwest::Error),

    /// Connection refused, DNS failure, TLS failure, ...
    #[error("upstream request failed")]
    Upstream(#[source] reqwest::Error),

    /// The client response could not be assembled.
    #[error("failed to build response")]
    Response(#[from] axum::http::Error),
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProxyError::UpstreamTimeout(e)
        } else {
            ProxyError::Upstream(e)
        }
    }
}

impl ProxyError {
    /// HTTP status returned to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Rewrite(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Response(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The error and all its sources, joined with `: `.
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.describe()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_error_is_client_error() {
        let err = ProxyError::from(RewriteError::CannotBeABase("mailto:x".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.describe().contains("mailto:x"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_bad_gateway() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::Client::new()
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap_err();
        let err = ProxyError::from(err);

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.describe().starts_with("upstream request failed: "));
    }
}
