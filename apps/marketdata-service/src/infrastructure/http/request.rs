//! HTTP request DTOs.

use serde::{Deserialize, Serialize};

/// Body of `POST /marketdata/symbols`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterSymbolRequest {
    /// Symbol to ingest.
    pub symbol: String,
}

/// Query string of `GET /marketdata/{symbol}/history`.
///
/// Both bounds are RFC 3339 instants. They are optional here so that a
/// missing bound maps to the API's own error body instead of the
/// extractor's.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Inclusive lower bound.
    pub start: Option<String>,
    /// Inclusive upper bound.
    pub end: Option<String>,
}
