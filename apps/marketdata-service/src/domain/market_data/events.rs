//! Events republished for downstream consumers.

use serde::{Deserialize, Serialize};

use super::Quote;

/// A quote addressed to a topic and keyed by symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteEvent {
    /// Destination topic, e.g. `prices.AAPL`.
    pub topic: String,
    /// Partition key (the symbol).
    pub key: String,
    /// Payload.
    pub quote: Quote,
}

impl QuoteEvent {
    /// Address `quote` to the topic rendered from `topic_pattern`, keyed by its symbol.
    ///
    /// Every `{symbol}` placeholder in the pattern is replaced.
    #[must_use]
    pub fn for_quote(topic_pattern: &str, quote: Quote) -> Self {
        let key = quote.symbol.as_str().to_string();
        Self {
            topic: topic_pattern.replace("{symbol}", &key),
            key,
            quote,
        }
    }
}
