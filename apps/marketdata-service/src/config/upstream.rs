//! Upstream quote provider configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::infrastructure::upstream::HttpQuoteFetcherConfig;

/// Upstream provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Provider base URL; quotes are read from `{base_url}/api/quote/{symbol}`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Read an absent price as zero instead of failing the fetch.
    #[serde(default)]
    pub allow_missing_price: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            allow_missing_price: false,
        }
    }
}

impl UpstreamConfig {
    /// Fetcher settings with the given request timeout.
    #[must_use]
    pub fn to_fetcher_config(&self, timeout: Duration) -> HttpQuoteFetcherConfig {
        HttpQuoteFetcherConfig {
            base_url: self.base_url.clone(),
            timeout,
            user_agent: self.user_agent.clone(),
            allow_missing_price: self.allow_missing_price,
        }
    }
}

fn default_base_url() -> String {
    "https://stooq.pl".to_string()
}

fn default_user_agent() -> String {
    concat!("marketdata-service/", env!("CARGO_PKG_VERSION")).to_string()
}
