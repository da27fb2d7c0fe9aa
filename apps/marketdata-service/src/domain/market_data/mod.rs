//! Market Data Bounded Context
//!
//! Quotes observed from the upstream provider, the history records persisted
//! for them, and the events republished downstream.

mod events;
mod historical_quote;
mod quote;

pub use events::QuoteEvent;
pub use historical_quote::{HistoricalQuoteRecord, NewHistoricalQuote, RecordId};
pub use quote::Quote;

/// Interval label stamped on records written from a live fetch.
pub const LIVE_QUOTE_INTERVAL: &str = "1m";
