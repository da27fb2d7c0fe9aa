//! Fallback Resolver
//!
//! Synthesizes a degraded quote from recent history when the upstream
//! provider cannot be used.

use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{QuoteStoreError, QuoteStorePort};
use crate::domain::market_data::Quote;
use crate::domain::shared::{Symbol, Timestamp};
use crate::observability::record_fallback;

/// Default look-back window.
pub const DEFAULT_LOOKBACK: Duration = Duration::from_secs(3600);

/// Fallback resolution errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FallbackError {
    /// No history inside the look-back window. Terminal for the caller.
    #[error("No fallback data for {symbol} in the last {lookback_secs}s")]
    NoData {
        /// Requested symbol.
        symbol: String,
        /// Look-back window in seconds.
        lookback_secs: u64,
    },

    /// The history lookup itself failed.
    #[error("Fallback lookup failed: {0}")]
    Store(#[from] QuoteStoreError),
}

/// Resolves the most recent stored quote inside a bounded look-back window.
pub struct FallbackResolver<S>
where
    S: QuoteStorePort,
{
    store: Arc<S>,
    lookback: Duration,
}

impl<S> FallbackResolver<S>
where
    S: QuoteStorePort,
{
    /// Create a resolver over `store` searching the trailing `lookback`.
    pub const fn new(store: Arc<S>, lookback: Duration) -> Self {
        Self { store, lookback }
    }

    /// The configured look-back window.
    pub const fn lookback(&self) -> Duration {
        self.lookback
    }

    /// Degraded quote from the latest record for `symbol` within `[now - lookback, now]`.
    ///
    /// # Errors
    ///
    /// [`FallbackError::NoData`] when the window is empty,
    /// [`FallbackError::Store`] when the lookup fails.
    pub async fn resolve(&self, symbol: &Symbol) -> Result<Quote, FallbackError> {
        let end = Timestamp::now();
        let start = end.minus(self.lookback);

        let records = match self.store.query_range(symbol, start, end).await {
            Ok(records) => records,
            Err(e) => {
                record_fallback("error");
                tracing::error!(symbol = %symbol, error = %e, "Fallback history lookup failed");
                return Err(FallbackError::Store(e));
            }
        };

        let Some(latest) = records.iter().max_by_key(|r| r.timestamp) else {
            record_fallback("miss");
            tracing::warn!(
                symbol = %symbol,
                lookback_secs = self.lookback.as_secs(),
                "No history available for fallback"
            );
            return Err(FallbackError::NoData {
                symbol: symbol.to_string(),
                lookback_secs: self.lookback.as_secs(),
            });
        };

        record_fallback("hit");
        tracing::info!(
            symbol = %symbol,
            record_id = %latest.id,
            record_timestamp = %latest.timestamp,
            "Serving degraded quote from history"
        );

        Ok(Quote::degraded_from(latest))
    }
}
