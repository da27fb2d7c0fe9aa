//! HTTP Quote Fetcher
//!
//! `reqwest` implementation of [`UpstreamQuotePort`]. One GET per call, no
//! retries: retry and recovery policy belongs to the circuit breaker.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response, Url};

use super::payload::QuotePayload;
use crate::application::ports::{UpstreamError, UpstreamQuotePort};
use crate::domain::market_data::Quote;
use crate::domain::shared::{Symbol, Timestamp};
use crate::observability::record_upstream_request;

/// Error bodies are truncated to this many characters.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Upper bound on a buffered response body.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Configuration for [`HttpQuoteFetcher`].
#[derive(Debug, Clone)]
pub struct HttpQuoteFetcherConfig {
    /// Provider base URL, e.g. `https://stooq.pl`.
    pub base_url: String,
    /// Client-level request timeout.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Treat an absent price as zero instead of failing.
    pub allow_missing_price: bool,
}

impl Default for HttpQuoteFetcherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://stooq.pl".to_string(),
            timeout: Duration::from_secs(5),
            user_agent: concat!("marketdata-service/", env!("CARGO_PKG_VERSION")).to_string(),
            allow_missing_price: false,
        }
    }
}

/// Fetches the latest quote from `GET {base_url}/api/quote/{symbol}`.
#[derive(Debug, Clone)]
pub struct HttpQuoteFetcher {
    client: Client,
    base_url: Url,
    allow_missing_price: bool,
}

impl HttpQuoteFetcher {
    /// Create a new fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Network`] if the base URL is not an absolute
    /// URL that can carry a path, or if the HTTP client cannot be built.
    pub fn new(config: &HttpQuoteFetcherConfig) -> Result<Self, UpstreamError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| UpstreamError::Network(format!("invalid base url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::Network(format!(
                "base url cannot carry a path: {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            allow_missing_price: config.allow_missing_price,
        })
    }

    /// The symbol is pushed as one percent-encoded path segment.
    fn quote_url(&self, symbol: &Symbol) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "quote", symbol.as_str()]);
        }
        url
    }

    async fn request(&self, symbol: &Symbol) -> Result<Quote, UpstreamError> {
        let response = self
            .client
            .get(self.quote_url(symbol))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();

        if !status.is_success() {
            let (body, _) = read_body(response, MAX_BODY_BYTES).await?;
            let text = String::from_utf8_lossy(&body);
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        if let Some(len) = response.content_length()
            && len > MAX_BODY_BYTES as u64
        {
            return Err(oversized_body());
        }
        let (body, truncated) = read_body(response, MAX_BODY_BYTES).await?;
        if truncated {
            return Err(oversized_body());
        }

        QuotePayload::parse(&body)?.into_quote(symbol, Timestamp::now(), self.allow_missing_price)
    }
}

/// Buffer at most `limit` bytes of the body.
///
/// The flag is set when the body was longer and reading stopped early.
async fn read_body(
    mut response: Response,
    limit: usize,
) -> Result<(Vec<u8>, bool), UpstreamError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(map_transport_error)? {
        let room = limit - body.len();
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            return Ok((body, true));
        }
        body.extend_from_slice(&chunk);
    }
    Ok((body, false))
}

fn oversized_body() -> UpstreamError {
    UpstreamError::Decode(format!("response body exceeds {MAX_BODY_BYTES} bytes"))
}

#[async_trait]
impl UpstreamQuotePort for HttpQuoteFetcher {
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, UpstreamError> {
        let started = Instant::now();
        let result = self.request(symbol).await;
        let elapsed = started.elapsed();

        let status_label = match &result {
            Ok(_) => "ok".to_string(),
            Err(UpstreamError::Status { status, .. }) => status.to_string(),
            Err(UpstreamError::Timeout) => "timeout".to_string(),
            Err(UpstreamError::Network(_)) => "network".to_string(),
            Err(UpstreamError::Decode(_) | UpstreamError::MissingPrice { .. }) => {
                "decode".to_string()
            }
        };
        record_upstream_request(&status_label, elapsed.as_secs_f64());

        match &result {
            Ok(quote) => tracing::debug!(
                symbol = %symbol,
                last = %quote.last,
                latency_ms = elapsed.as_millis(),
                "Upstream quote fetched"
            ),
            Err(e) => tracing::warn!(
                symbol = %symbol,
                error = %e,
                latency_ms = elapsed.as_millis(),
                "Upstream quote fetch failed"
            ),
        }

        result
    }
}

fn map_transport_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout
    } else if e.is_decode() {
        UpstreamError::Decode(e.to_string())
    } else {
        UpstreamError::Network(e.to_string())
    }
}
