//! Upstream quote provider adapter.

mod http_fetcher;
mod payload;

pub use http_fetcher::{HttpQuoteFetcher, HttpQuoteFetcherConfig};
