//! Upstream URL rewriting.
//!
//! # Responsibilities
//! - Replace scheme and authority with the upstream target's
//! - Join the target path and the request path with exactly one slash
//! - Join target and request queries, target first
//!
//! # Design Decisions
//! - Joining works on the escaped (percent-encoded) path, so escapes such as
//!   `%2F` in either input survive unchanged
//! - Fragments are never forwarded

use axum::http::Uri;
use thiserror::Error;
use url::Url;

/// Errors produced while rewriting a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// The target URL cannot carry a path (e.g. `mailto:`).
    #[error("upstream target {0} cannot be used as a base URL")]
    CannotBeABase(String),
}

/// Build the upstream URL for an inbound request URI.
pub fn rewrite_request_url(request_uri: &Uri, target: &Url) -> Result<Url, RewriteError> {
    if target.cannot_be_a_base() {
        return Err(RewriteError::CannotBeABase(target.to_string()));
    }

    let mut url = target.clone();
    url.set_path(&join_url_path(target.path(), request_uri.path()));

    let query = join_query(target.query().unwrap_or(""), request_uri.query().unwrap_or(""));
    url.set_query(if query.is_empty() { None } else { Some(&query) });
    url.set_fragment(None);

    Ok(url)
}

/// Concatenate two paths with exactly one separating slash.
pub fn join_url_path(a: &str, b: &str) -> String {
    let a_slash = a.ends_with('/');
    let b_slash = b.starts_with('/');

    match (a_slash, b_slash) {
        (true, true) => format!("{}{}", a, &b[1..]),
        (false, false) => format!("{}/{}", a, b),
        _ => format!("{}{}", a, b),
    }
}

/// Join two raw query strings, `target` first.
pub fn join_query(target: &str, request: &str) -> String {
    if target.is_empty() || request.is_empty() {
        format!("{}{}", target, request)
    } else {
        format!("{}&{}", target, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrite(request: &str, target: &str) -> String {
        let uri: Uri = request.parse().unwrap();
        let target = Url::parse(target).unwrap();
        rewrite_request_url(&uri, &target).unwrap().to_string()
    }

    #[test]
    fn test_single_slash_for_every_combination() {
        for a in ["/api", "/api/"] {
            for b in ["v1/items", "/v1/items"] {
                assert_eq!(join_url_path(a, b), "/api/v1/items", "a={:?} b={:?}", a, b);
            }
        }
        assert_eq!(join_url_path("", ""), "/");
        assert_eq!(join_url_path("/", "/"), "/");
    }

    #[test]
    fn test_query_join() {
        assert_eq!(join_query("", ""), "");
        assert_eq!(join_query("", "b=2"), "b=2");
        assert_eq!(join_query("a=1", ""), "a=1");
        assert_eq!(join_query("a=1", "b=2"), "a=1&b=2");
    }

    #[test]
    fn test_scheme_and_host_replaced() {
        assert_eq!(
            rewrite("http://proxy.local:8888/index.html", "https://upstream.internal:8443"),
            "https://upstream.internal:8443/index.html"
        );
    }

    #[test]
    fn test_target_path_prefix() {
        assert_eq!(rewrite("/v1/items", "http://up/api"), "http://up/api/v1/items");
        assert_eq!(rewrite("/v1/items", "http://up/api/"), "http://up/api/v1/items");
        assert_eq!(rewrite("/", "http://up/api"), "http://up/api/");
        assert_eq!(rewrite("/", "http://up"), "http://up/");
    }

    #[test]
    fn test_queries_merged_target_first() {
        assert_eq!(rewrite("/s?q=rust", "http://up/?key=abc"), "http://up/s?key=abc&q=rust");
        assert_eq!(rewrite("/s", "http://up/?key=abc"), "http://up/s?key=abc");
        assert_eq!(rewrite("/s?q=rust", "http://up/"), "http://up/s?q=rust");
        assert_eq!(rewrite("/s", "http://up/"), "http://up/s");
    }

    #[test]
    fn test_escapes_preserved() {
        assert_eq!(
            rewrite("/files/a%2Fb%20c", "http://up/root%20dir"),
            "http://up/root%20dir/files/a%2Fb%20c"
        );
    }

    #[test]
    fn test_cannot_be_a_base() {
        let uri: Uri = "/x".parse().unwrap();
        let target = Url::parse("mailto:ops@example.com").unwrap();
        assert!(matches!(
            rewrite_request_url(&uri, &target),
            Err(RewriteError::CannotBeABase(_))
        ));
    }
}
