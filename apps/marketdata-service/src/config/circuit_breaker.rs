//! Circuit breaker configuration for the upstream call.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Circuit breaker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    /// Failure rate threshold to open circuit.
    #[serde(default = "default_failure_rate_threshold")]
    pub failure_rate_threshold: f64,
    /// Sliding window size.
    #[serde(default = "default_sliding_window_size")]
    pub sliding_window_size: u32,
    /// Minimum calls before evaluating.
    #[serde(default = "default_minimum_calls")]
    pub minimum_calls: u32,
    /// Duration in open state (milliseconds).
    #[serde(default = "default_wait_duration_ms")]
    pub wait_duration_in_open_ms: u64,
    /// Calls permitted in half-open state.
    #[serde(default = "default_permitted_calls")]
    pub permitted_calls_in_half_open: u32,
    /// Upstream call deadline (milliseconds).
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_rate_threshold: default_failure_rate_threshold(),
            sliding_window_size: default_sliding_window_size(),
            minimum_calls: default_minimum_calls(),
            wait_duration_in_open_ms: default_wait_duration_ms(),
            permitted_calls_in_half_open: default_permitted_calls(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl CircuitBreakerSettings {
    /// Convert config settings to resilience module's `CircuitBreakerConfig`.
    #[must_use]
    pub const fn to_resilience_config(&self) -> crate::resilience::CircuitBreakerConfig {
        crate::resilience::CircuitBreakerConfig {
            failure_rate_threshold: self.failure_rate_threshold,
            sliding_window_size: self.sliding_window_size,
            minimum_calls: self.minimum_calls,
            wait_duration_in_open: Duration::from_millis(self.wait_duration_in_open_ms),
            permitted_calls_in_half_open: self.permitted_calls_in_half_open,
            call_timeout: self.call_timeout(),
        }
    }

    /// Upstream call deadline.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

const fn default_failure_rate_threshold() -> f64 {
    0.5
}

const fn default_sliding_window_size() -> u32 {
    20
}

const fn default_minimum_calls() -> u32 {
    10
}

const fn default_wait_duration_ms() -> u64 {
    10_000
}

const fn default_permitted_calls() -> u32 {
    1
}

const fn default_call_timeout_ms() -> u64 {
    5_000
}
