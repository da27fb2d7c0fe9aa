//! Query History Use Case
//!
//! Read-only access to stored quote records for a symbol and time range.

use std::sync::Arc;

use crate::application::ports::{QuoteStoreError, QuoteStorePort};
use crate::domain::market_data::HistoricalQuoteRecord;
use crate::domain::shared::{DomainError, Symbol, Timestamp};

/// History query errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HistoryError {
    /// Bad symbol or inverted range.
    #[error("Invalid history request: {0}")]
    InvalidRequest(#[from] DomainError),

    /// The store could not be queried.
    #[error("History lookup failed: {0}")]
    Store(#[from] QuoteStoreError),
}

/// Use case for reading stored quote history.
pub struct QueryHistoryUseCase<S>
where
    S: QuoteStorePort,
{
    store: Arc<S>,
}

impl<S> QueryHistoryUseCase<S>
where
    S: QuoteStorePort,
{
    /// Create a new QueryHistoryUseCase.
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Records for `symbol` with `start <= timestamp <= end`, oldest first.
    ///
    /// # Errors
    ///
    /// [`HistoryError::InvalidRequest`] for an invalid symbol or `start > end`,
    /// [`HistoryError::Store`] when the lookup fails.
    pub async fn execute(
        &self,
        symbol: &Symbol,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<HistoricalQuoteRecord>, HistoryError> {
        symbol.validate()?;

        if start > end {
            return Err(DomainError::InvalidTimeRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            }
            .into());
        }

        let records = self.store.query_range(symbol, start, end).await?;

        tracing::debug!(symbol = %symbol, count = records.len(), "History query served");

        Ok(records)
    }
}
