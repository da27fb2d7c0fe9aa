//! Timestamp value object for temporal data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A UTC timestamp for quotes and history records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a new Timestamp from a DateTime<Utc>.
    #[must_use]
    pub const fn new(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the current timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse from an ISO 8601 string.
    ///
    /// # Errors
    ///
    /// Returns error if the string is not a valid ISO 8601 timestamp.
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        let dt = DateTime::parse_from_rfc3339(s)?;
        Ok(Self(dt.with_timezone(&Utc)))
    }

    /// Get the inner DateTime<Utc>.
    #[must_use]
    pub const fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Format as ISO 8601 / RFC 3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// The timestamp `lookback` before this one.
    ///
    /// Saturates at the earliest representable instant.
    #[must_use]
    pub fn minus(&self, lookback: Duration) -> Self {
        chrono::Duration::from_std(lookback)
            .ok()
            .and_then(|d| self.0.checked_sub_signed(d))
            .map_or(Self(DateTime::<Utc>::MIN_UTC), Self)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rfc3339_normalizes_to_utc() {
        let ts = Timestamp::parse("2026-03-01T10:00:00+02:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-03-01T08:00:00+00:00");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn minus_subtracts_lookback() {
        let ts = Timestamp::parse("2026-03-01T10:00:00Z").unwrap();
        let earlier = ts.minus(Duration::from_secs(3600));
        assert_eq!(earlier.to_rfc3339(), "2026-03-01T09:00:00+00:00");
    }

    #[test]
    fn minus_saturates() {
        let ts = Timestamp::new(DateTime::<Utc>::MIN_UTC);
        assert_eq!(ts.minus(Duration::from_secs(60)), ts);
    }

    #[test]
    fn ordering_follows_time() {
        let a = Timestamp::parse("2026-03-01T09:00:00Z").unwrap();
        let b = Timestamp::parse("2026-03-01T10:00:00Z").unwrap();
        assert!(a < b);
    }
}
