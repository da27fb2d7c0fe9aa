//! Observability configuration for logging, metrics, and tracing.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::observability::{LogFormat, MetricsConfig, TracingConfig};

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObservabilityConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Prometheus exporter configuration.
    #[serde(default)]
    pub metrics: MetricsSettings,
    /// OpenTelemetry configuration.
    #[serde(default)]
    pub tracing: OtelSettings,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format (`json` or `pretty`).
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Include span information.
    #[serde(default = "default_true")]
    pub include_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            include_spans: true,
        }
    }
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Listener address; empty disables the exporter.
    #[serde(default = "default_metrics_addr")]
    pub listen_addr: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_metrics_addr(),
        }
    }
}

/// OpenTelemetry span export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtelSettings {
    /// Export spans over OTLP.
    #[serde(default)]
    pub enabled: bool,
    /// OTLP gRPC endpoint.
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
    /// `service.name` resource attribute.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for OtelSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: default_otlp_endpoint(),
            service_name: default_service_name(),
        }
    }
}

impl ObservabilityConfig {
    /// Parsed log format, if recognised.
    #[must_use]
    pub fn log_format(&self) -> Option<LogFormat> {
        match self.logging.format.to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" => Some(LogFormat::Pretty),
            _ => None,
        }
    }

    /// Subscriber settings. An unrecognised format falls back to JSON.
    #[must_use]
    pub fn to_tracing_config(&self) -> TracingConfig {
        TracingConfig {
            log_level: self.logging.level.clone(),
            log_format: self.log_format().unwrap_or(LogFormat::Json),
            include_spans: self.logging.include_spans,
            otlp_endpoint: self
                .tracing
                .enabled
                .then(|| self.tracing.otlp_endpoint.clone()),
            service_name: self.tracing.service_name.clone(),
        }
    }

    /// Exporter settings, or `None` when metrics are disabled.
    ///
    /// # Errors
    ///
    /// Returns the parse error when `listen_addr` is not a socket address.
    pub fn to_metrics_config(&self) -> Result<Option<MetricsConfig>, std::net::AddrParseError> {
        let addr = self.metrics.listen_addr.trim();
        if addr.is_empty() {
            return Ok(None);
        }
        Ok(Some(MetricsConfig::with_addr(addr.parse::<SocketAddr>()?)))
    }
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "marketdata-service".to_string()
}
