//! Configuration module for the market data service.
//!
//! YAML configuration with environment variable interpolation and
//! validation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use marketdata_service::config::{load_config, load_default_config};
//!
//! // $MARKETDATA_CONFIG, then ./config.yaml, then built-in defaults
//! let config = load_default_config()?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! println!("HTTP port: {}", config.server.http_port);
//! ```

mod circuit_breaker;
mod fallback;
mod observability;
mod publisher;
mod server;
mod upstream;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use circuit_breaker::CircuitBreakerSettings;
pub use fallback::FallbackConfig;
pub use observability::{LoggingConfig, MetricsSettings, ObservabilityConfig, OtelSettings};
pub use publisher::PublisherConfig;
pub use server::ServerConfig;
pub use upstream::UpstreamConfig;

use crate::application::use_cases::IngestSettings;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "MARKETDATA_CONFIG";

/// Config file read when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream provider configuration.
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Event publisher configuration.
    #[serde(default)]
    pub publisher: PublisherConfig,
    /// Circuit breaker configuration.
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
    /// Fallback configuration.
    #[serde(default)]
    pub fallback: FallbackConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Settings for the ingestion use case.
    #[must_use]
    pub fn ingest_settings(&self) -> IngestSettings {
        IngestSettings {
            topic_pattern: self.publisher.topic_pattern.clone(),
            fallback_lookback: self.fallback.lookback(),
        }
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration the way the service binary does.
///
/// Reads `$MARKETDATA_CONFIG` when set (the file must exist), otherwise
/// `config.yaml` if present, otherwise the built-in defaults.
///
/// # Errors
///
/// Returns a `ConfigError` if a config file cannot be read, parsed, or validated.
pub fn load_default_config() -> Result<Config, ConfigError> {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.is_empty() => load_config(Some(&path)),
        _ if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(None),
        _ => {
            let config = Config::default();
            validate_config(&config)?;
            Ok(config)
        }
    }
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. Unset or empty
/// variables take the default, or the empty string without one.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        let default_value = cap.get(2).map_or("", |m| m.as_str());

        match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    fn invalid(message: &str) -> Result<(), ConfigError> {
        Err(ConfigError::ValidationError(message.to_string()))
    }

    if config.upstream.base_url.trim().is_empty() {
        return invalid("upstream.base_url must not be empty");
    }

    if !config.publisher.topic_pattern.contains("{symbol}") {
        return invalid("publisher.topic_pattern must contain {symbol}");
    }

    if config.publisher.channel_capacity == 0 {
        return invalid("publisher.channel_capacity must be positive");
    }

    let cb = &config.circuit_breaker;
    if !(cb.failure_rate_threshold > 0.0 && cb.failure_rate_threshold <= 1.0) {
        return invalid("circuit_breaker.failure_rate_threshold must be in (0.0, 1.0]");
    }

    if cb.sliding_window_size == 0 {
        return invalid("circuit_breaker.sliding_window_size must be positive");
    }

    if cb.minimum_calls == 0 || cb.minimum_calls > cb.sliding_window_size {
        return invalid(
            "circuit_breaker.minimum_calls must be between 1 and sliding_window_size",
        );
    }

    if cb.permitted_calls_in_half_open == 0 {
        return invalid("circuit_breaker.permitted_calls_in_half_open must be positive");
    }

    if cb.wait_duration_in_open_ms == 0 || cb.call_timeout_ms == 0 {
        return invalid("circuit_breaker timeouts must be positive");
    }

    if config.fallback.lookback_secs == 0 {
        return invalid("fallback.lookback_secs must be positive");
    }

    if config.observability.log_format().is_none() {
        return invalid("observability.logging.format must be one of: json, pretty");
    }

    if config.observability.to_metrics_config().is_err() {
        return invalid("observability.metrics.listen_addr must be a socket address or empty");
    }

    Ok(())
}
