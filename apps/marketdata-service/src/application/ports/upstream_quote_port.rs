//! Upstream Quote Port (Driven Port)
//!
//! Interface for fetching the latest quote from the market data provider.

use async_trait::async_trait;

use crate::domain::market_data::Quote;
use crate::domain::shared::Symbol;

/// Failure of a single upstream fetch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UpstreamError {
    /// Transport-level failure (connect, reset, TLS).
    #[error("Upstream network error: {0}")]
    Network(String),

    /// The request did not complete within its deadline.
    #[error("Upstream request timed out")]
    Timeout,

    /// Non-success HTTP status.
    #[error("Upstream returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// Response body could not be decoded into a quote.
    #[error("Upstream payload could not be decoded: {0}")]
    Decode(String),

    /// Payload carried no price.
    #[error("Upstream payload has no price for {symbol}")]
    MissingPrice {
        /// Requested symbol.
        symbol: String,
    },
}

/// Port for fetching quotes from the upstream provider.
///
/// Implementations perform exactly one outbound call per invocation.
#[async_trait]
pub trait UpstreamQuotePort: Send + Sync {
    /// Fetch the latest quote for `symbol`.
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, UpstreamError>;
}
