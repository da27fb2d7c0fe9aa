//! Observability module for metrics, tracing, and logging.
//!
//! This module provides instrumentation for the market data service,
//! including Prometheus metrics export and distributed tracing.

mod metrics;
mod telemetry;

pub use metrics::{
    MetricsConfig, MetricsError, circuit_breaker_state, init_metrics,
    record_circuit_breaker_failure, record_circuit_breaker_rejected,
    record_circuit_breaker_state, record_circuit_breaker_success, record_fallback,
    record_ingest, record_persistence_failure, record_publish_failure, record_upstream_request,
};
pub use telemetry::{LogFormat, TracingConfig, TracingError, TracingGuard, init_tracing};
