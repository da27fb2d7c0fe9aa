//! Persisted history records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{LIVE_QUOTE_INTERVAL, Quote};
use crate::domain::shared::{Symbol, Timestamp};

/// Store-assigned identifier of a history record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new RecordId.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a random (v4) identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A history record before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHistoricalQuote {
    /// Quoted symbol.
    pub symbol: Symbol,
    /// Observation time.
    pub timestamp: Timestamp,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Traded volume.
    pub volume: Option<u64>,
    /// Bucket label.
    pub interval: String,
}

impl NewHistoricalQuote {
    /// Record a live quote as a flat candle: open, high, low and close all equal `last`.
    #[must_use]
    pub fn from_live_quote(quote: &Quote) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            timestamp: quote.timestamp,
            open: quote.last,
            high: quote.last,
            low: quote.last,
            close: quote.last,
            volume: quote.volume,
            interval: LIVE_QUOTE_INTERVAL.to_string(),
        }
    }

    /// Attach the store-assigned id.
    #[must_use]
    pub fn with_id(self, id: RecordId) -> HistoricalQuoteRecord {
        HistoricalQuoteRecord {
            id,
            symbol: self.symbol,
            timestamp: self.timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            interval: self.interval,
        }
    }
}

/// A persisted history record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalQuoteRecord {
    /// Store-assigned id.
    pub id: RecordId,
    /// Quoted symbol.
    pub symbol: Symbol,
    /// Observation time.
    pub timestamp: Timestamp,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Traded volume.
    pub volume: Option<u64>,
    /// Bucket label.
    pub interval: String,
}
