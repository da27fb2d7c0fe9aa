//! HTTP response DTOs and error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::application::use_cases::{HistoryError, IngestError};
use crate::domain::shared::DomainError;
use crate::resilience::{CircuitBreakerMetrics, CircuitBreakerState};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` when the breaker is closed, `degraded` otherwise.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Upstream breaker snapshot.
    pub circuit_breaker: CircuitBreakerResponse,
}

/// Circuit breaker snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerResponse {
    /// Breaker name.
    pub name: String,
    /// Current state.
    pub state: CircuitBreakerState,
    /// Failure ratio over the sliding window.
    pub failure_rate: f64,
    /// Calls that reached the upstream.
    pub total_calls: u64,
    /// Calls that failed or timed out.
    pub total_failures: u64,
    /// Calls short-circuited while open.
    pub not_permitted_calls: u64,
}

impl From<CircuitBreakerMetrics> for CircuitBreakerResponse {
    fn from(m: CircuitBreakerMetrics) -> Self {
        Self {
            name: m.name,
            state: m.state,
            failure_rate: m.failure_rate,
            total_calls: m.total_calls,
            total_failures: m.total_failures,
            not_permitted_calls: m.not_permitted_calls,
        }
    }
}

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// An error ready to be rendered as an HTTP response.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    /// 400 with the given code.
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
            message: message.into(),
        }
    }

    /// HTTP status of this error.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Error code of this error.
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.code.to_string(),
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        let (status, code) = match &err {
            IngestError::InvalidSymbol(_) => (StatusCode::BAD_REQUEST, "INVALID_SYMBOL"),
            IngestError::NoFallbackData { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "NO_FALLBACK_DATA")
            }
            IngestError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
            IngestError::FallbackStore(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
        };
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<HistoryError> for ApiError {
    fn from(err: HistoryError) -> Self {
        let (status, code) = match &err {
            HistoryError::InvalidRequest(DomainError::InvalidTimeRange { .. }) => {
                (StatusCode::BAD_REQUEST, "INVALID_RANGE")
            }
            HistoryError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_SYMBOL"),
            HistoryError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
        };
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}
