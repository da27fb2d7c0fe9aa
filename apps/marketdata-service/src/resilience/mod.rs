//! Resilience patterns for upstream calls.
//!
//! This module provides the circuit breaker that guards the upstream quote
//! provider and dispatches to a fallback when the provider is failing.

mod circuit_breaker;

pub use circuit_breaker::{
    CallFailure, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitBreakerState,
};
