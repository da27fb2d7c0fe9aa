//! Application Services
//!
//! Reusable application logic shared by use cases.

mod fallback_resolver;

pub use fallback_resolver::{DEFAULT_LOOKBACK, FallbackError, FallbackResolver};
