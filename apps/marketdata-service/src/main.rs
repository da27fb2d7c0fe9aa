//! Market Data Service Binary
//!
//! Starts the quote ingestion service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin marketdata-service
//! ```
//!
//! # Environment Variables
//!
//! - `MARKETDATA_CONFIG`: Path to the YAML config (default: config.yaml, optional)
//! - `RUST_LOG`: Log filter, overrides `observability.logging.level`
//!
//! Any `${VAR}` referenced from the config file is read from the environment
//! (and from `.env` when present).

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use marketdata_service::config::{Config, load_default_config};
use marketdata_service::observability::{TracingGuard, init_metrics, init_tracing};
use marketdata_service::{
    AppState, BroadcastEventPublisher, CircuitBreaker, HttpQuoteFetcher, InMemoryQuoteStore,
    IngestQuoteUseCase, QueryHistoryUseCase, create_router,
};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Name of the breaker guarding the upstream provider.
const UPSTREAM_BREAKER: &str = "upstream-quotes";

/// Concrete type alias for the ingest use case.
type ConcreteIngestUseCase =
    IngestQuoteUseCase<HttpQuoteFetcher, InMemoryQuoteStore, BroadcastEventPublisher>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config = load_default_config().context("failed to load configuration")?;
    let _tracing_guard = start_telemetry(&config)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Market Data Service"
    );
    log_config(&config);

    let store = Arc::new(InMemoryQuoteStore::new());
    let publisher = Arc::new(BroadcastEventPublisher::new(
        config.publisher.channel_capacity,
    ));
    let ingest = create_ingest_use_case(&config, Arc::clone(&store), Arc::clone(&publisher))?;
    let history = Arc::new(QueryHistoryUseCase::new(Arc::clone(&store)));

    let state = AppState {
        ingest,
        history,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let app = create_router(state);

    let addr = config.server.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {addr}"))?;

    tracing::info!(addr = %addr, "HTTP server listening");
    tracing::info!("  GET  /health");
    tracing::info!("  POST /marketdata/symbols");
    tracing::info!("  GET  /marketdata/{{symbol}}/quote");
    tracing::info!("  GET  /marketdata/{{symbol}}/history?start=..&end=..");

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .into_future();

    tokio::select! {
        result = server => result.context("HTTP server failed")?,
        () = async {
            shutdown.cancelled().await;
            tokio::time::sleep(SHUTDOWN_TIMEOUT).await;
        } => {
            tracing::warn!(
                timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                "Graceful shutdown timed out, forcing exit"
            );
        }
    }

    publisher.close();
    tracing::info!(records = store.len(), "Market Data Service stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Install the log subscriber and the Prometheus exporter.
fn start_telemetry(config: &Config) -> anyhow::Result<TracingGuard> {
    let guard = init_tracing(&config.observability.to_tracing_config())
        .context("failed to initialize tracing")?;

    match config
        .observability
        .to_metrics_config()
        .context("invalid metrics listen address")?
    {
        Some(metrics_config) => {
            init_metrics(&metrics_config).context("failed to start metrics exporter")?;
        }
        None => tracing::info!("Metrics exporter disabled"),
    }

    Ok(guard)
}

/// Log the loaded configuration.
fn log_config(config: &Config) {
    let cb = &config.circuit_breaker;
    tracing::info!(
        upstream = %config.upstream.base_url,
        topic_pattern = %config.publisher.topic_pattern,
        failure_rate_threshold = cb.failure_rate_threshold,
        sliding_window_size = cb.sliding_window_size,
        minimum_calls = cb.minimum_calls,
        wait_duration_in_open_ms = cb.wait_duration_in_open_ms,
        call_timeout_ms = cb.call_timeout_ms,
        fallback_lookback_secs = config.fallback.lookback_secs,
        "Configuration loaded"
    );
}

/// Wire the fetcher, breaker, and ports into the ingest use case.
fn create_ingest_use_case(
    config: &Config,
    store: Arc<InMemoryQuoteStore>,
    publisher: Arc<BroadcastEventPublisher>,
) -> anyhow::Result<Arc<ConcreteIngestUseCase>> {
    let fetcher = HttpQuoteFetcher::new(
        &config
            .upstream
            .to_fetcher_config(config.circuit_breaker.call_timeout()),
    )
    .context("failed to build upstream HTTP client")?;

    let breaker = Arc::new(CircuitBreaker::new(
        UPSTREAM_BREAKER,
        config.circuit_breaker.to_resilience_config(),
    ));

    Ok(Arc::new(IngestQuoteUseCase::new(
        Arc::new(fetcher),
        store,
        publisher,
        breaker,
        config.ingest_settings(),
    )))
}

/// Wait for shutdown signal (SIGTERM or SIGINT), then cancel `token`.
///
/// # Panics
///
/// Panics if signal handlers cannot be installed; a process that cannot
/// observe termination signals should not start serving.
#[allow(clippy::expect_used)]
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
