//! Domain errors for the market data service.

use std::fmt;

/// Domain-level errors that can occur in business logic.
///
/// These errors are independent of infrastructure concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid value for a field.
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// A time range whose start is after its end.
    InvalidTimeRange {
        /// Range start (RFC 3339).
        start: String,
        /// Range end (RFC 3339).
        end: String,
    },
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { field, message } => {
                write!(f, "Invalid value for '{field}': {message}")
            }
            Self::InvalidTimeRange { start, end } => {
                write!(f, "Invalid time range: start {start} is after end {end}")
            }
        }
    }
}

impl std::error::Error for DomainError {}
