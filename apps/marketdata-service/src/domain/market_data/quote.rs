//! Quote value returned to callers and published downstream.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::HistoricalQuoteRecord;
use crate::domain::shared::{Symbol, Timestamp};

/// Latest known price for a symbol.
///
/// `last` is always present; `bid`, `ask` and `volume` are independently
/// optional. A live fetch carries whatever the provider returned, a degraded
/// quote synthesized from history repeats the close into `bid` and `ask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Quoted symbol.
    pub symbol: Symbol,
    /// When the quote was observed or synthesized.
    pub timestamp: Timestamp,
    /// Last traded price.
    pub last: Decimal,
    /// Best bid, if known.
    pub bid: Option<Decimal>,
    /// Best ask, if known.
    pub ask: Option<Decimal>,
    /// Traded volume, if known.
    pub volume: Option<u64>,
}

impl Quote {
    /// Build a degraded quote from a persisted history record.
    ///
    /// `last`, `bid` and `ask` all take the record's close; the record's
    /// timestamp and volume are carried through unchanged.
    #[must_use]
    pub fn degraded_from(record: &HistoricalQuoteRecord) -> Self {
        Self {
            symbol: record.symbol.clone(),
            timestamp: record.timestamp,
            last: record.close,
            bid: Some(record.close),
            ask: Some(record.close),
            volume: record.volume,
        }
    }
}
