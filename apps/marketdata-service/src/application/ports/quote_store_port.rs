//! Quote Store Port (Driven Port)
//!
//! Interface for appending and querying historical quote records.

use async_trait::async_trait;

use crate::domain::market_data::{HistoricalQuoteRecord, NewHistoricalQuote, RecordId};
use crate::domain::shared::{Symbol, Timestamp};

/// Quote store errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QuoteStoreError {
    /// Store is unreachable.
    #[error("Quote store connection error: {message}")]
    ConnectionError {
        /// Error detail.
        message: String,
    },

    /// Write was rejected.
    #[error("Quote store write failed: {message}")]
    WriteFailed {
        /// Error detail.
        message: String,
    },

    /// Query failed.
    #[error("Quote store query failed: {message}")]
    QueryFailed {
        /// Error detail.
        message: String,
    },
}

/// Port for historical quote persistence.
#[async_trait]
pub trait QuoteStorePort: Send + Sync {
    /// Append a record and return its store-assigned id.
    async fn save(&self, record: NewHistoricalQuote) -> Result<RecordId, QuoteStoreError>;

    /// Records for `symbol` with `start <= timestamp <= end`, ascending by timestamp.
    async fn query_range(
        &self,
        symbol: &Symbol,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<HistoricalQuoteRecord>, QuoteStoreError>;
}
