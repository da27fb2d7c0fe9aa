//! Symbol value object for instrument identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// A quote symbol as understood by the upstream provider.
///
/// The value is kept exactly as supplied so that quotes echo the
/// requested symbol and upstream lookups stay case-faithful.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Validate the symbol before it is used as a store key.
    ///
    /// Any non-blank text is accepted; the upstream adapter percent-encodes
    /// it as a single path segment.
    ///
    /// # Errors
    ///
    /// Returns error if symbol is empty or whitespace only.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.0.trim().is_empty() {
            return Err(DomainError::InvalidValue {
                field: "symbol".to_string(),
                message: "Symbol cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn symbol_keeps_original_case() {
        let s = Symbol::new("aapl.us");
        assert_eq!(s.as_str(), "aapl.us");
    }

    #[test]
    fn symbol_display() {
        let s = Symbol::new("MSFT");
        assert_eq!(format!("{s}"), "MSFT");
    }

    #[test_case("AAPL" ; "plain ticker")]
    #[test_case("BRK.B" ; "share class")]
    #[test_case("^SPX" ; "index")]
    #[test_case("EURUSD=X" ; "fx pair")]
    #[test_case("aapl.us" ; "lowercase with exchange suffix")]
    #[test_case("BTC/USD" ; "crypto pair with slash")]
    #[test_case("TSE:7203" ; "exchange prefix")]
    #[test_case("BRK B" ; "inner space")]
    #[test_case("NESTLÉ.SW" ; "non ascii")]
    fn symbol_validate_accepts(raw: &str) {
        assert!(Symbol::new(raw).validate().is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "blank")]
    #[test_case("\t\n" ; "whitespace only")]
    fn symbol_validate_rejects(raw: &str) {
        assert!(Symbol::new(raw).validate().is_err());
    }

    #[test]
    fn symbol_from_conversions() {
        let s1: Symbol = "AAPL".into();
        assert_eq!(s1.as_str(), "AAPL");

        let s2: Symbol = String::from("MSFT").into();
        assert_eq!(s2.into_inner(), "MSFT");
    }

    #[test]
    fn symbol_serializes_as_plain_string() {
        let json = serde_json::to_string(&Symbol::new("AAPL")).unwrap();
        assert_eq!(json, "\"AAPL\"");
    }
}
