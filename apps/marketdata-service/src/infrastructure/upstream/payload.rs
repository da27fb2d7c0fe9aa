//! Wire format of the upstream quote endpoint.
//!
//! Providers are inconsistent about numeric encoding, so prices accept JSON
//! numbers or numeric strings and volume accepts an integer or integer string.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::ports::UpstreamError;
use crate::domain::market_data::Quote;
use crate::domain::shared::{Symbol, Timestamp};

/// Price encoded as a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(super) enum DecimalField {
    Number(serde_json::Number),
    Text(String),
}

impl DecimalField {
    fn to_decimal(&self, field: &str) -> Result<Decimal, UpstreamError> {
        let raw = match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        };

        let value = Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .map_err(|_| UpstreamError::Decode(format!("{field} is not a number: {raw:?}")))?;

        if value.is_sign_negative() {
            return Err(UpstreamError::Decode(format!("{field} is negative: {value}")));
        }

        Ok(value)
    }
}

/// Volume encoded as a JSON integer or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(super) enum VolumeField {
    Number(u64),
    Text(String),
}

impl VolumeField {
    fn to_u64(&self) -> Result<u64, UpstreamError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| UpstreamError::Decode(format!("volume is not an integer: {s:?}"))),
        }
    }
}

/// `{"price": .., "bid": .., "ask": .., "volume": ..}`
#[derive(Debug, Clone, Deserialize)]
pub(super) struct QuotePayload {
    pub price: Option<DecimalField>,
    pub bid: Option<DecimalField>,
    pub ask: Option<DecimalField>,
    pub volume: Option<VolumeField>,
}

impl QuotePayload {
    /// Decode a response body.
    pub fn parse(body: &[u8]) -> Result<Self, UpstreamError> {
        serde_json::from_slice(body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    /// Build a quote stamped with `fetched_at`.
    ///
    /// A missing price is an error unless `allow_missing_price`, in which
    /// case it reads as zero.
    pub fn into_quote(
        self,
        symbol: &Symbol,
        fetched_at: Timestamp,
        allow_missing_price: bool,
    ) -> Result<Quote, UpstreamError> {
        let last = match &self.price {
            Some(price) => price.to_decimal("price")?,
            None if allow_missing_price => Decimal::ZERO,
            None => {
                return Err(UpstreamError::MissingPrice {
                    symbol: symbol.to_string(),
                });
            }
        };

        Ok(Quote {
            symbol: symbol.clone(),
            timestamp: fetched_at,
            last,
            bid: self.bid.as_ref().map(|b| b.to_decimal("bid")).transpose()?,
            ask: self.ask.as_ref().map(|a| a.to_decimal("ask")).transpose()?,
            volume: self.volume.as_ref().map(VolumeField::to_u64).transpose()?,
        })
    }
}
