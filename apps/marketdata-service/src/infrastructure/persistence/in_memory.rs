//! In-memory quote store.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::application::ports::{QuoteStoreError, QuoteStorePort};
use crate::domain::market_data::{HistoricalQuoteRecord, NewHistoricalQuote, RecordId};
use crate::domain::shared::{Symbol, Timestamp};

/// In-memory implementation of `QuoteStorePort`.
///
/// Append-only; records are never updated. Suitable for testing and
/// single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryQuoteStore {
    records: RwLock<Vec<HistoricalQuoteRecord>>,
}

impl InMemoryQuoteStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of records in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all records.
    pub fn clear(&self) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Insert a fully-formed record (for test setup and seeding).
    pub fn add(&self, record: HistoricalQuoteRecord) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Snapshot of every stored record, in insertion order.
    #[must_use]
    pub fn all(&self) -> Vec<HistoricalQuoteRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl QuoteStorePort for InMemoryQuoteStore {
    async fn save(&self, record: NewHistoricalQuote) -> Result<RecordId, QuoteStoreError> {
        let id = RecordId::generate();
        self.add(record.with_id(id.clone()));
        Ok(id)
    }

    async fn query_range(
        &self,
        symbol: &Symbol,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<HistoricalQuoteRecord>, QuoteStoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);

        let mut matching: Vec<_> = records
            .iter()
            .filter(|r| &r.symbol == symbol && r.timestamp >= start && r.timestamp <= end)
            .cloned()
            .collect();
        drop(records);

        // Stable sort keeps insertion order for equal timestamps.
        matching.sort_by_key(|r| r.timestamp);
        Ok(matching)
    }
}
