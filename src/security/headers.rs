//! Header manipulation between client and upstream.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Drop `Host` so the upstream client derives it from the rewritten URL
//! - Strip conditional-request headers so a miss always gets a full body
//!
//! # Design Decisions
//! - Framing headers (`Transfer-Encoding`, `Connection`) are re-established
//!   by each hop; everything end-to-end is copied verbatim
//! - Names listed in `Connection` are treated as hop-by-hop too

use axum::http::header::{self, HeaderMap, HeaderName};

/// Hop-by-hop headers (RFC 9110 §7.6.1).
pub const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Conditional-request headers. A 304 from upstream has no body to cache.
pub const CONDITIONAL: [HeaderName; 2] = [header::IF_NONE_MATCH, header::IF_MODIFIED_SINCE];

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Prepare inbound request headers for forwarding upstream.
pub fn sanitize_request_headers(headers: &mut HeaderMap) {
    strip_hop_by_hop(headers);
    headers.remove(header::HOST);
    for name in CONDITIONAL.iter() {
        headers.remove(name);
    }
}

/// Prepare upstream response headers for the client.
pub fn sanitize_response_headers(headers: &mut HeaderMap) {
    strip_hop_by_hop(headers);
}
