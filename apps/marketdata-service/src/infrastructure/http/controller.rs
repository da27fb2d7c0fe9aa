//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to application use cases.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::application::ports::{EventPublisherPort, QuoteStorePort, UpstreamQuotePort};
use crate::application::use_cases::{IngestQuoteUseCase, QueryHistoryUseCase};
use crate::domain::market_data::{HistoricalQuoteRecord, Quote};
use crate::domain::shared::{Symbol, Timestamp};
use crate::resilience::CircuitBreakerState;

use super::request::{HistoryQuery, RegisterSymbolRequest};
use super::response::{ApiError, HealthResponse};

/// Application state shared across handlers.
pub struct AppState<U, S, P>
where
    U: UpstreamQuotePort,
    S: QuoteStorePort,
    P: EventPublisherPort,
{
    /// Use case for ingesting quotes.
    pub ingest: Arc<IngestQuoteUseCase<U, S, P>>,
    /// Use case for reading history.
    pub history: Arc<QueryHistoryUseCase<S>>,
    /// Application version.
    pub version: String,
}

impl<U, S, P> Clone for AppState<U, S, P>
where
    U: UpstreamQuotePort,
    S: QuoteStorePort,
    P: EventPublisherPort,
{
    fn clone(&self) -> Self {
        Self {
            ingest: Arc::clone(&self.ingest),
            history: Arc::clone(&self.history),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<U, S, P>(state: AppState<U, S, P>) -> Router
where
    U: UpstreamQuotePort + 'static,
    S: QuoteStorePort + 'static,
    P: EventPublisherPort + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/marketdata/symbols", post(register_symbol))
        .route("/marketdata/{symbol}/quote", get(latest_quote))
        .route("/marketdata/{symbol}/history", get(quote_history))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check<U, S, P>(State(state): State<AppState<U, S, P>>) -> impl IntoResponse
where
    U: UpstreamQuotePort,
    S: QuoteStorePort,
    P: EventPublisherPort,
{
    let breaker = state.ingest.breaker().metrics();
    let status = if breaker.state == CircuitBreakerState::Closed {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: state.version.clone(),
        circuit_breaker: breaker.into(),
    })
}

/// Trigger an ingest for a symbol; the quote itself is discarded.
async fn register_symbol<U, S, P>(
    State(state): State<AppState<U, S, P>>,
    payload: Result<Json<RegisterSymbolRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError>
where
    U: UpstreamQuotePort,
    S: QuoteStorePort,
    P: EventPublisherPort,
{
    let Json(request) =
        payload.map_err(|e| ApiError::bad_request("INVALID_REQUEST", e.body_text()))?;

    state.ingest.ingest(&Symbol::new(request.symbol)).await?;

    Ok(StatusCode::ACCEPTED)
}

/// Latest quote, live or degraded.
async fn latest_quote<U, S, P>(
    State(state): State<AppState<U, S, P>>,
    Path(symbol): Path<String>,
) -> Result<Json<Quote>, ApiError>
where
    U: UpstreamQuotePort,
    S: QuoteStorePort,
    P: EventPublisherPort,
{
    let quote = state.ingest.ingest(&Symbol::new(symbol)).await?;
    Ok(Json(quote))
}

/// Stored records in `[start, end]`, oldest first.
///
/// The range is buffered and returned as one JSON array rather than streamed
/// record by record. The store port returns a `Vec`, so there is nothing
/// incremental to forward; a cursor-based port would be needed to stream.
async fn quote_history<U, S, P>(
    State(state): State<AppState<U, S, P>>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoricalQuoteRecord>>, ApiError>
where
    U: UpstreamQuotePort,
    S: QuoteStorePort,
    P: EventPublisherPort,
{
    let start = parse_bound("start", query.start)?;
    let end = parse_bound("end", query.end)?;

    let records = state
        .history
        .execute(&Symbol::new(symbol), start, end)
        .await?;
    Ok(Json(records))
}

fn parse_bound(name: &str, value: Option<String>) -> Result<Timestamp, ApiError> {
    let raw = value.ok_or_else(|| {
        ApiError::bad_request(
            "MISSING_PARAMETER",
            format!("query parameter '{name}' is required"),
        )
    })?;

    Timestamp::parse(&raw).map_err(|e| {
        ApiError::bad_request(
            "INVALID_TIMESTAMP",
            format!("'{name}' is not an RFC 3339 timestamp: {e}"),
        )
    })
}
