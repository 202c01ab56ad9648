//! Upstream HTTP client.
//!
//! # Design Decisions
//! - Redirects are passed through to the client, never followed
//! - No automatic decompression: bodies are forwarded byte for byte
//! - Certificate verification is on unless explicitly disabled

use std::time::Duration;

use crate::config::UpstreamConfig;

/// Build the client used for every upstream request.
pub fn build_client(config: &UpstreamConfig) -> reqwest::Result<reqwest::Client> {
    if config.insecure_skip_verify {
        tracing::warn!(
            target_url = %config.target_url,
            "Upstream TLS certificate verification is DISABLED"
        );
    }

    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .danger_accept_invalid_certs(config.insecure_skip_verify)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_with_and_without_verification() {
        let mut config = UpstreamConfig::default();
        assert!(build_client(&config).is_ok());

        config.insecure_skip_verify = true;
        assert!(build_client(&config).is_ok());
    }
}
