//! Fallback resolution configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fallback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// How far back to search for a substitute quote (seconds).
    #[serde(default = "default_lookback_secs")]
    pub lookback_secs: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            lookback_secs: default_lookback_secs(),
        }
    }
}

impl FallbackConfig {
    /// Look-back window as a `Duration`.
    #[must_use]
    pub const fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_secs)
    }
}

const fn default_lookback_secs() -> u64 {
    3_600
}
