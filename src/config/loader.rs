//! Configuration loading from disk and environment.
//!
//! Precedence (lowest to highest): built-in defaults, optional TOML file,
//! environment variables.

use std::path::{Path, PathBuf};
use std::fs;
use std::str::FromStr;
use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Upstream base URL. Required.
pub const ENV_TARGET_URL: &str = "TARGET_URL";
/// Listen port on all interfaces.
pub const ENV_PORT: &str = "PORT";
/// Directory holding the cache snapshot. Empty disables caching.
pub const ENV_CACHE_DIR: &str = "CACHE_DIR";
/// Any non-empty value enables verbose logging.
pub const ENV_DEBUG: &str = "DEBUG";
/// Truthy value disables upstream certificate verification.
pub const ENV_TLS_INSECURE_SKIP_VERIFY: &str = "TLS_INSECURE_SKIP_VERIFY";
/// Snapshot flush interval in seconds.
pub const ENV_CACHE_FLUSH_INTERVAL_SECS: &str = "CACHE_FLUSH_INTERVAL_SECS";
/// Single-flight wait limit in milliseconds.
pub const ENV_CACHE_LOCK_TIMEOUT_MS: &str = "CACHE_LOCK_TIMEOUT_MS";
/// Upstream connect timeout in seconds.
pub const ENV_UPSTREAM_CONNECT_TIMEOUT_SECS: &str = "UPSTREAM_CONNECT_TIMEOUT_SECS";
/// Prometheus exporter bind address.
pub const ENV_METRICS_ADDR: &str = "METRICS_ADDR";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(toml::de::Error),
    InvalidEnv { name: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "IO error reading {}: {}", path.display(), e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::InvalidEnv { name, value } => {
                write!(f, "Invalid value for {}: {:?}", name, value)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file plus the process environment,
/// then validate it.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    load_config_with(path, |name| std::env::var(name).ok())
}

/// Same as [`load_config`] with an injectable environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => ProxyConfig::default(),
    };

    apply_env(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML config file without validating it.
pub fn load_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Overlay environment variables onto `config`.
pub fn apply_env<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(target) = lookup(ENV_TARGET_URL) {
        config.upstream.target_url = target;
    }

    if let Some(port) = lookup(ENV_PORT) {
        let port: u16 = parse_env(ENV_PORT, &port)?;
        config.listener.bind_address = format!("0.0.0.0:{}", port);
    }

    if let Some(dir) = lookup(ENV_CACHE_DIR) {
        config.cache.dir = if dir.is_empty() { None } else { Some(PathBuf::from(dir)) };
    }

    if let Some(debug) = lookup(ENV_DEBUG) {
        config.observability.debug = !debug.is_empty();
    }

    if let Some(value) = lookup(ENV_TLS_INSECURE_SKIP_VERIFY) {
        config.upstream.insecure_skip_verify = parse_flag(ENV_TLS_INSECURE_SKIP_VERIFY, &value)?;
    }

    if let Some(value) = lookup(ENV_CACHE_FLUSH_INTERVAL_SECS) {
        config.cache.flush_interval_secs = parse_env(ENV_CACHE_FLUSH_INTERVAL_SECS, &value)?;
    }

    if let Some(value) = lookup(ENV_CACHE_LOCK_TIMEOUT_MS) {
        config.cache.lock_timeout_ms = parse_env(ENV_CACHE_LOCK_TIMEOUT_MS, &value)?;
    }

    if let Some(value) = lookup(ENV_UPSTREAM_CONNECT_TIMEOUT_SECS) {
        config.upstream.connect_timeout_secs = parse_env(ENV_UPSTREAM_CONNECT_TIMEOUT_SECS, &value)?;
    }

    if let Some(addr) = lookup(ENV_METRICS_ADDR) {
        config.observability.metrics_address = if addr.is_empty() { None } else { Some(addr) };
    }

    Ok(())
}

fn parse_env<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value: value.to_string(),
        }),
    }
}
