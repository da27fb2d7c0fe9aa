//! Prometheus metrics for the market data service.
//!
//! Provides metrics for ingestion outcomes, upstream requests, fallback
//! resolution, publish/persistence failures, and circuit breakers.
//!
//! # Example
//!
//! ```ignore
//! use marketdata_service::observability::{init_metrics, MetricsConfig};
//!
//! let config = MetricsConfig::default();
//! init_metrics(&config)?;
//!
//! record_ingest("live", 0.015);
//! ```

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for latency measurements (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 9090)),
            // Latency buckets from 1ms to 10s
            latency_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

// ============================================================================
// Ingestion Metrics
// ============================================================================

/// Record a completed ingest call.
///
/// # Arguments
///
/// * `outcome` - `live`, `fallback` or `error`
/// * `latency_seconds` - Wall time of the whole ingest call
pub fn record_ingest(outcome: &str, latency_seconds: f64) {
    counter!(
        "marketdata_ingest_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        "marketdata_ingest_duration_seconds",
        "outcome" => outcome.to_string()
    )
    .record(latency_seconds);
}

/// Record one upstream request.
///
/// # Arguments
///
/// * `status` - HTTP status code, or `network` / `timeout` / `decode`
/// * `latency_seconds` - Request latency
pub fn record_upstream_request(status: &str, latency_seconds: f64) {
    counter!(
        "marketdata_upstream_requests_total",
        "status" => status.to_string()
    )
    .increment(1);

    histogram!("marketdata_upstream_latency_seconds").record(latency_seconds);
}

/// Record a quote event that could not be published.
pub fn record_publish_failure(topic: &str) {
    counter!(
        "marketdata_publish_failures_total",
        "topic" => topic.to_string()
    )
    .increment(1);
}

/// Record a history record that could not be written.
pub fn record_persistence_failure() {
    counter!("marketdata_persistence_failures_total").increment(1);
}

/// Record a fallback resolution.
///
/// # Arguments
///
/// * `outcome` - `hit`, `miss` or `error`
pub fn record_fallback(outcome: &str) {
    counter!(
        "marketdata_fallback_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

// ============================================================================
// Circuit Breaker Metrics
// ============================================================================

/// Circuit breaker state values for the gauge.
pub mod circuit_breaker_state {
    /// Circuit is closed (healthy).
    pub const CLOSED: f64 = 0.0;
    /// Circuit is open (failing).
    pub const OPEN: f64 = 1.0;
    /// Circuit is half-open (probing).
    pub const HALF_OPEN: f64 = 2.0;
}

/// Update circuit breaker state gauge.
///
/// # Arguments
///
/// * `name` - Breaker name (e.g., "upstream")
/// * `state` - Numeric state (0=closed, 1=open, 2=`half_open`)
pub fn record_circuit_breaker_state(name: &str, state: f64) {
    gauge!(
        "circuit_breaker_state",
        "name" => name.to_string()
    )
    .set(state);
}

/// Record a failure seen by a circuit breaker.
pub fn record_circuit_breaker_failure(name: &str) {
    counter!(
        "circuit_breaker_calls_total",
        "name" => name.to_string(),
        "outcome" => "failure"
    )
    .increment(1);
}

/// Record a success seen by a circuit breaker.
pub fn record_circuit_breaker_success(name: &str) {
    counter!(
        "circuit_breaker_calls_total",
        "name" => name.to_string(),
        "outcome" => "success"
    )
    .increment(1);
}

/// Record a call rejected due to an open circuit.
pub fn record_circuit_breaker_rejected(name: &str) {
    counter!(
        "circuit_breaker_calls_total",
        "name" => name.to_string(),
        "outcome" => "rejected"
    )
    .increment(1);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert_eq!(config.listen_addr.port(), 9090);
        assert!(!config.latency_buckets.is_empty());
    }

    #[test]
    fn test_config_with_addr() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let config = MetricsConfig::with_addr(addr);
        assert_eq!(config.listen_addr.port(), 8080);
    }

    #[test]
    fn test_latency_buckets_sorted() {
        let config = MetricsConfig::default();
        assert!(
            config.latency_buckets.windows(2).all(|w| w[0] < w[1]),
            "buckets must be strictly increasing"
        );
    }

    // Recording without an installed recorder is a no-op; these only guard against panics.

    #[test]
    fn test_record_ingest() {
        record_ingest("live", 0.015);
        record_ingest("fallback", 0.002);
    }

    #[test]
    fn test_record_upstream_request() {
        record_upstream_request("200", 0.120);
        record_upstream_request("timeout", 5.0);
    }

    #[test]
    fn test_record_failures() {
        record_publish_failure("prices.AAPL");
        record_persistence_failure();
        record_fallback("miss");
    }

    #[test]
    fn test_circuit_breaker_state_constants() {
        assert!((circuit_breaker_state::CLOSED - 0.0).abs() < f64::EPSILON);
        assert!((circuit_breaker_state::OPEN - 1.0).abs() < f64::EPSILON);
        assert!((circuit_breaker_state::HALF_OPEN - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_circuit_breaker_metrics() {
        record_circuit_breaker_state("upstream", circuit_breaker_state::OPEN);
        record_circuit_breaker_failure("upstream");
        record_circuit_breaker_success("upstream");
        record_circuit_breaker_rejected("upstream");
    }
}
