//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the upstream target URL
//! - Validate value ranges (intervals > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream target URL is not set (TARGET_URL)")]
    MissingTargetUrl,

    #[error("upstream target URL {url:?} is invalid: {reason}")]
    InvalidTargetUrl { url: String, reason: String },

    #[error("bind address {0:?} is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("metrics address {0:?} is not a valid socket address")]
    InvalidMetricsAddress(String),

    #[error("cache flush interval must be greater than zero")]
    ZeroFlushInterval,
}

/// Validate a loaded configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = parse_target_url(&config.upstream.target_url) {
        errors.push(e);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.listener.bind_address.clone()));
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }

    if config.cache.enabled() && config.cache.flush_interval_secs == 0 {
        errors.push(ValidationError::ZeroFlushInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse and check the upstream target URL.
pub fn parse_target_url(raw: &str) -> Result<Url, ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::MissingTargetUrl);
    }

    let invalid = |reason: &str| ValidationError::InvalidTargetUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }

    Ok(url)
}
