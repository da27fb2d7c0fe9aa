//! Log subscriber and OpenTelemetry tracing setup.
//!
//! Installs a `tracing-subscriber` registry with:
//! - an `EnvFilter` (`RUST_LOG` wins over the configured level)
//! - a JSON or human-readable console layer
//! - an optional OTLP span exporter
//!
//! # Example
//!
//! ```ignore
//! use marketdata_service::observability::{init_tracing, TracingConfig};
//!
//! let _guard = init_tracing(&TracingConfig::default())?;
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Console log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable, multi-line.
    Pretty,
}

/// Configuration for logging and OpenTelemetry tracing.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub log_level: String,
    /// Console output format.
    pub log_format: LogFormat,
    /// Include the current span in JSON output.
    pub include_spans: bool,
    /// OTLP endpoint; `None` disables span export.
    pub otlp_endpoint: Option<String>,
    /// Service name for resource attributes.
    pub service_name: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            include_spans: true,
            otlp_endpoint: None,
            service_name: "marketdata-service".to_string(),
        }
    }
}

/// Error type for tracing operations.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// Failed to create OTLP exporter.
    #[error("failed to create OTLP exporter: {0}")]
    ExporterError(String),
    /// Failed to initialize tracing subscriber.
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberError(String),
}

/// Guard that shuts down the tracer provider on drop.
pub struct TracingGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Error shutting down tracer provider: {e:?}");
        }
    }
}

/// Install the global subscriber.
///
/// Returns a guard that flushes and shuts down span export when dropped.
///
/// # Errors
///
/// Returns an error if the OTLP exporter cannot be built or a global
/// subscriber is already installed.
pub fn init_tracing(config: &TracingConfig) -> Result<TracingGuard, TracingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let json_layer = (config.log_format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(config.include_spans)
            .with_span_list(false)
    });
    let pretty_layer = (config.log_format == LogFormat::Pretty)
        .then(|| tracing_subscriber::fmt::layer().pretty());

    let provider = match &config.otlp_endpoint {
        Some(endpoint) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()
                .map_err(|e| TracingError::ExporterError(e.to_string()))?;

            let resource = Resource::builder()
                .with_service_name(config.service_name.clone())
                .build();

            Some(
                SdkTracerProvider::builder()
                    .with_resource(resource)
                    .with_batch_exporter(exporter)
                    .build(),
            )
        }
        None => None,
    };

    let otel_layer = provider
        .as_ref()
        .map(|p| OpenTelemetryLayer::new(p.tracer(config.service_name.clone())));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| TracingError::SubscriberError(e.to_string()))?;

    if let Some(endpoint) = &config.otlp_endpoint {
        tracing::info!(
            endpoint = %endpoint,
            service = %config.service_name,
            "OpenTelemetry tracing initialized"
        );
    }

    Ok(TracingGuard { provider })
}
