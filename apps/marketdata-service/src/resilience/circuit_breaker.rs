//! Circuit breaker for the upstream quote provider.
//!
//! Stops calling a failing provider once its failure rate crosses a
//! threshold, and periodically lets a single probe through to detect
//! recovery.
//!
//! # State Machine
//!
//! ```text
//! CLOSED → OPEN       (failure rate >= threshold, once minimum_calls are in the window)
//! OPEN → HALF_OPEN    (wait duration elapsed, evaluated when the breaker is consulted)
//! HALF_OPEN → CLOSED  (probe succeeded; window and counters reset)
//! HALF_OPEN → OPEN    (probe failed; wait timer restarts)
//! ```
//!
//! # Configuration
//!
//! - `failure_rate_threshold`: Open at this failure rate (default: 50%)
//! - `sliding_window_size`: Number of outcomes to track (default: 20)
//! - `minimum_calls`: Minimum outcomes before evaluating (default: 10)
//! - `wait_duration_in_open`: Time to stay open (default: 10s)
//! - `permitted_calls_in_half_open`: Probe calls allowed (default: 1)
//! - `call_timeout`: Maximum call duration (default: 5s)
//!
//! # Example
//!
//! ```rust,ignore
//! use marketdata_service::resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! let breaker = CircuitBreaker::new("upstream", CircuitBreakerConfig::default());
//!
//! let quote = breaker
//!     .execute(fetcher.fetch_quote(&symbol), |failure| async move {
//!         tracing::warn!(%failure, "using fallback");
//!         resolver.resolve(&symbol).await
//!     })
//!     .await?;
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::observability::{
    circuit_breaker_state, record_circuit_breaker_failure, record_circuit_breaker_rejected,
    record_circuit_breaker_state, record_circuit_breaker_success,
};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitBreakerState {
    /// Circuit is closed, calls flow normally.
    Closed,
    /// Circuit is open, calls are short-circuited.
    Open,
    /// Circuit is admitting a probe call.
    HalfOpen,
}

impl CircuitBreakerState {
    const fn gauge_value(self) -> f64 {
        match self {
            Self::Closed => circuit_breaker_state::CLOSED,
            Self::Open => circuit_breaker_state::OPEN,
            Self::HalfOpen => circuit_breaker_state::HALF_OPEN,
        }
    }
}

impl fmt::Display for CircuitBreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Failure rate threshold to open circuit (0.0-1.0).
    pub failure_rate_threshold: f64,
    /// Number of outcomes in the sliding window.
    pub sliding_window_size: u32,
    /// Minimum outcomes before evaluating failure rate.
    pub minimum_calls: u32,
    /// Duration to stay in `OPEN` state.
    pub wait_duration_in_open: Duration,
    /// Probe calls admitted in `HALF_OPEN` state.
    pub permitted_calls_in_half_open: u32,
    /// Maximum call duration before timeout.
    pub call_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5, // 50%
            sliding_window_size: 20,
            minimum_calls: 10,
            wait_duration_in_open: Duration::from_secs(10),
            permitted_calls_in_half_open: 1,
            call_timeout: Duration::from_secs(5),
        }
    }
}

/// Why a guarded call did not produce a value.
///
/// Handed to the fallback of [`CircuitBreaker::execute`]. All three variants
/// are treated alike by callers that only care whether a fallback is needed.
#[derive(Debug, thiserror::Error)]
pub enum CallFailure<E> {
    /// Short-circuited without invoking the call.
    #[error("call not permitted: circuit breaker is open")]
    Rejected,
    /// The call returned an error.
    #[error("call failed: {0}")]
    Failed(E),
    /// The call exceeded the configured timeout.
    #[error("call timed out after {0:?}")]
    TimedOut(Duration),
}

impl<E> CallFailure<E> {
    /// Short label for logs and metrics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::Failed(_) => "failed",
            Self::TimedOut(_) => "timed_out",
        }
    }
}

/// Outcome of a call for sliding window tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallOutcome {
    Success,
    Failure,
}

/// Mutable breaker state, guarded by a single mutex.
#[derive(Debug)]
struct Inner {
    state: CircuitBreakerState,
    window: VecDeque<CallOutcome>,
    opened_at: Option<Instant>,
    /// Bumped on every transition; outcomes of calls admitted under an
    /// older generation are discarded.
    generation: u64,
    half_open_in_flight: u32,
    half_open_successes: u32,
}

impl Inner {
    fn new(generation: u64) -> Self {
        Self {
            state: CircuitBreakerState::Closed,
            window: VecDeque::new(),
            opened_at: None,
            generation,
            half_open_in_flight: 0,
            half_open_successes: 0,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn failure_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let failures = self
            .window
            .iter()
            .filter(|o| **o == CallOutcome::Failure)
            .count();
        failures as f64 / self.window.len() as f64
    }
}

/// Circuit breaker for a single upstream target.
///
/// Shared across tasks behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Target name for logging and metrics.
    name: String,
    /// Configuration.
    config: CircuitBreakerConfig,
    /// State, window and timers.
    inner: Mutex<Inner>,
    /// Total recorded outcomes (for metrics).
    total_calls: AtomicU64,
    /// Total recorded failures (for metrics).
    total_failures: AtomicU64,
    /// Calls short-circuited while open (for metrics).
    not_permitted_calls: AtomicU64,
    /// State transitions counter (for metrics).
    state_transitions: AtomicU64,
}

impl CircuitBreaker {
    /// Create a new circuit breaker in the `CLOSED` state.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let breaker = Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner::new(0)),
            total_calls: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            not_permitted_calls: AtomicU64::new(0),
            state_transitions: AtomicU64::new(0),
        };
        record_circuit_breaker_state(&breaker.name, circuit_breaker_state::CLOSED);
        breaker
    }

    /// Get the target name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get the call timeout for this circuit breaker.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        self.config.call_timeout
    }

    /// Get the current state.
    ///
    /// An `OPEN` breaker whose wait has elapsed is moved to `HALF_OPEN` first.
    #[must_use]
    pub fn state(&self) -> CircuitBreakerState {
        let mut inner = self.lock();
        self.refresh(&mut inner);
        inner.state
    }

    /// Check whether a call would currently be admitted, without reserving a probe slot.
    #[must_use]
    pub fn is_call_permitted(&self) -> bool {
        let mut inner = self.lock();
        self.refresh(&mut inner);
        match inner.state {
            CircuitBreakerState::Closed => true,
            CircuitBreakerState::Open => false,
            CircuitBreakerState::HalfOpen => {
                inner.half_open_in_flight < self.config.permitted_calls_in_half_open
            }
        }
    }

    /// Decide whether a call may proceed, reserving a probe slot in `HALF_OPEN`.
    ///
    /// Callers that get `true` must report the outcome with
    /// [`record_success`](Self::record_success) or
    /// [`record_failure`](Self::record_failure).
    #[must_use]
    pub fn try_acquire_permission(&self) -> bool {
        self.acquire().is_some()
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        self.record(CallOutcome::Success, None);
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        self.record(CallOutcome::Failure, None);
    }

    /// Record a call that was short-circuited without reaching the target.
    pub fn record_not_permitted(&self) {
        self.not_permitted_calls.fetch_add(1, Ordering::Relaxed);
        record_circuit_breaker_rejected(&self.name);
        tracing::debug!(name = %self.name, "Call short-circuited by open circuit breaker");
    }

    /// Run `call` through the breaker, dispatching to `fallback` when it cannot succeed.
    ///
    /// - Not permitted: `call` is dropped unpolled and `fallback(Rejected)` runs.
    /// - `call` errors: the failure is recorded and `fallback(Failed(e))` runs.
    /// - `call` exceeds the call timeout: the failure is recorded and
    ///   `fallback(TimedOut)` runs.
    ///
    /// If the returned future is dropped mid-call, any probe slot it held is
    /// released without recording an outcome.
    pub async fn execute<T, E, F, Fut, Fb, FbFut>(&self, call: Fut, fallback: Fb) -> Result<T, F>
    where
        Fut: Future<Output = Result<T, E>>,
        Fb: FnOnce(CallFailure<E>) -> FbFut,
        FbFut: Future<Output = Result<T, F>>,
    {
        let Some(generation) = self.acquire() else {
            self.record_not_permitted();
            return fallback(CallFailure::Rejected).await;
        };

        let mut permit = Permit {
            breaker: self,
            generation,
            settled: false,
        };

        let failure = match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(Ok(value)) => {
                permit.settle(CallOutcome::Success);
                return Ok(value);
            }
            Ok(Err(e)) => {
                permit.settle(CallOutcome::Failure);
                CallFailure::Failed(e)
            }
            Err(_) => {
                permit.settle(CallOutcome::Failure);
                tracing::warn!(
                    name = %self.name,
                    timeout_ms = self.config.call_timeout.as_millis(),
                    "Guarded call timed out"
                );
                CallFailure::TimedOut(self.config.call_timeout)
            }
        };

        fallback(failure).await
    }

    /// Get metrics for this circuit breaker.
    ///
    /// Call counters cover the current closed cycle: they restart when a
    /// probe closes the breaker. `state_transitions` is a lifetime count.
    #[must_use]
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let mut inner = self.lock();
        self.refresh(&mut inner);
        CircuitBreakerMetrics {
            name: self.name.clone(),
            state: inner.state,
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            not_permitted_calls: self.not_permitted_calls.load(Ordering::Relaxed),
            state_transitions: self.state_transitions.load(Ordering::Relaxed),
            failure_rate: inner.failure_rate(),
        }
    }

    /// Force the circuit breaker to open (for testing or emergency).
    pub fn force_open(&self) {
        let mut inner = self.lock();
        self.transition(&mut inner, CircuitBreakerState::Open);
    }

    /// Return to a fresh `CLOSED` breaker with empty window and zeroed counters.
    pub fn reset(&self) {
        let mut inner = self.lock();
        let previous = inner.state;
        *inner = Inner::new(inner.generation + 1);
        drop(inner);

        self.total_calls.store(0, Ordering::Relaxed);
        self.total_failures.store(0, Ordering::Relaxed);
        self.not_permitted_calls.store(0, Ordering::Relaxed);
        self.state_transitions.store(0, Ordering::Relaxed);
        record_circuit_breaker_state(&self.name, circuit_breaker_state::CLOSED);

        tracing::info!(
            name = %self.name,
            from = %previous,
            "Circuit breaker reset"
        );
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve admission for one call, returning the generation it was admitted under.
    fn acquire(&self) -> Option<u64> {
        let mut inner = self.lock();
        self.refresh(&mut inner);
        match inner.state {
            CircuitBreakerState::Closed => Some(inner.generation),
            CircuitBreakerState::Open => None,
            CircuitBreakerState::HalfOpen => {
                if inner.half_open_in_flight < self.config.permitted_calls_in_half_open {
                    inner.half_open_in_flight += 1;
                    Some(inner.generation)
                } else {
                    None
                }
            }
        }
    }

    /// Give back a probe slot whose call never reported an outcome.
    fn release(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation && inner.state == CircuitBreakerState::HalfOpen {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }

    /// Record call outcome and update state.
    fn record(&self, outcome: CallOutcome, generation: Option<u64>) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        match outcome {
            CallOutcome::Success => record_circuit_breaker_success(&self.name),
            CallOutcome::Failure => {
                self.total_failures.fetch_add(1, Ordering::Relaxed);
                record_circuit_breaker_failure(&self.name);
            }
        }

        let mut inner = self.lock();

        if let Some(generation) = generation
            && generation != inner.generation
        {
            tracing::debug!(
                name = %self.name,
                state = %inner.state,
                "Discarding outcome of a call admitted before the last transition"
            );
            return;
        }

        match inner.state {
            CircuitBreakerState::Closed => {
                inner.window.push_back(outcome);
                while inner.window.len() > self.config.sliding_window_size as usize {
                    inner.window.pop_front();
                }

                if inner.window.len() >= self.config.minimum_calls as usize
                    && inner.failure_rate() >= self.config.failure_rate_threshold
                {
                    self.transition(&mut inner, CircuitBreakerState::Open);
                }
            }
            CircuitBreakerState::HalfOpen => {
                inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
                match outcome {
                    CallOutcome::Failure => {
                        self.transition(&mut inner, CircuitBreakerState::Open);
                    }
                    CallOutcome::Success => {
                        inner.half_open_successes += 1;
                        if inner.half_open_successes >= self.config.permitted_calls_in_half_open {
                            self.transition(&mut inner, CircuitBreakerState::Closed);
                        }
                    }
                }
            }
            CircuitBreakerState::Open => {
                tracing::warn!(
                    name = %self.name,
                    "Call recorded while circuit is OPEN"
                );
            }
        }
    }

    /// Check for time-based state transitions (`OPEN` -> `HALF_OPEN`).
    fn refresh(&self, inner: &mut Inner) {
        if inner.state == CircuitBreakerState::Open
            && inner
                .opened_at
                .is_some_and(|opened| opened.elapsed() >= self.config.wait_duration_in_open)
        {
            self.transition(inner, CircuitBreakerState::HalfOpen);
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitBreakerState) {
        let from = inner.state;
        if from == to {
            return;
        }

        inner.state = to;
        inner.generation += 1;
        inner.half_open_in_flight = 0;
        inner.half_open_successes = 0;

        match to {
            CircuitBreakerState::Open => {
                inner.opened_at = Some(Instant::now());
            }
            CircuitBreakerState::HalfOpen => {}
            CircuitBreakerState::Closed => {
                inner.window.clear();
                inner.opened_at = None;
                self.total_calls.store(0, Ordering::Relaxed);
                self.total_failures.store(0, Ordering::Relaxed);
                self.not_permitted_calls.store(0, Ordering::Relaxed);
            }
        }

        self.state_transitions.fetch_add(1, Ordering::Relaxed);
        record_circuit_breaker_state(&self.name, to.gauge_value());

        if to == CircuitBreakerState::Open {
            tracing::warn!(
                name = %self.name,
                from = %from,
                to = %to,
                failure_rate = inner.failure_rate(),
                "Circuit breaker opened"
            );
        } else {
            tracing::info!(
                name = %self.name,
                from = %from,
                to = %to,
                "Circuit breaker state changed"
            );
        }
    }
}

/// Admission held by an in-flight guarded call.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Permit<'_> {
    fn settle(&mut self, outcome: CallOutcome) {
        self.settled = true;
        self.breaker.record(outcome, Some(self.generation));
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release(self.generation);
        }
    }
}

/// Metrics for a circuit breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Target name.
    pub name: String,
    /// Current state.
    pub state: CircuitBreakerState,
    /// Recorded outcomes since the breaker last closed.
    pub total_calls: u64,
    /// Recorded failures since the breaker last closed.
    pub total_failures: u64,
    /// Calls short-circuited since the breaker last closed.
    pub not_permitted_calls: u64,
    /// Number of state transitions over the breaker's lifetime.
    pub state_transitions: u64,
    /// Current failure rate over the window (0.0-1.0).
    pub failure_rate: f64,
}
