//! Ingest Quote Use Case
//!
//! The single entry point of the ingestion pipeline:
//!
//! 1. validate the symbol
//! 2. fetch through the circuit breaker
//! 3. live quote → persist → publish → return
//! 4. failure or open circuit → fallback resolver → return (no persist, no publish)

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::application::ports::{
    EventPublishError, EventPublisherPort, QuoteStoreError, QuoteStorePort, UpstreamQuotePort,
};
use crate::application::services::{DEFAULT_LOOKBACK, FallbackError, FallbackResolver};
use crate::domain::market_data::{NewHistoricalQuote, Quote, QuoteEvent};
use crate::domain::shared::{DomainError, Symbol};
use crate::observability::{record_ingest, record_persistence_failure, record_publish_failure};
use crate::resilience::CircuitBreaker;

/// Ingestion errors surfaced to callers.
///
/// Upstream failures never appear here: they are recovered by the fallback.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IngestError {
    /// Symbol failed validation.
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(#[from] DomainError),

    /// The live quote could not be written. Publish was not attempted.
    #[error("Failed to persist quote: {0}")]
    Persistence(QuoteStoreError),

    /// Upstream unavailable and no history inside the look-back window.
    #[error("No fallback data available for {symbol}")]
    NoFallbackData {
        /// Requested symbol.
        symbol: String,
    },

    /// Upstream unavailable and the history lookup failed.
    #[error("Fallback lookup failed: {0}")]
    FallbackStore(QuoteStoreError),
}

impl From<FallbackError> for IngestError {
    fn from(err: FallbackError) -> Self {
        match err {
            FallbackError::NoData { symbol, .. } => Self::NoFallbackData { symbol },
            FallbackError::Store(e) => Self::FallbackStore(e),
        }
    }
}

/// A quote that reached the event bus publisher but was not accepted.
#[derive(Debug, Clone)]
pub struct PublishFailure {
    /// Topic the event was addressed to.
    pub topic: String,
    /// Event key (symbol).
    pub key: String,
    /// Publisher error.
    pub error: EventPublishError,
}

/// Callback invoked for every swallowed publish failure.
pub type PublishFailureHook = Arc<dyn Fn(&PublishFailure) + Send + Sync>;

/// Tunables for the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Topic pattern; `{symbol}` is replaced with the quote's symbol.
    pub topic_pattern: String,
    /// Look-back window for the fallback resolver.
    pub fallback_lookback: Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            topic_pattern: "prices.{symbol}".to_string(),
            fallback_lookback: DEFAULT_LOOKBACK,
        }
    }
}

/// Where a returned quote came from.
enum Sourced {
    Live(Quote),
    Degraded(Quote),
}

/// Use case for ingesting the latest quote of a symbol.
pub struct IngestQuoteUseCase<U, S, P>
where
    U: UpstreamQuotePort,
    S: QuoteStorePort,
    P: EventPublisherPort,
{
    upstream: Arc<U>,
    store: Arc<S>,
    publisher: Arc<P>,
    breaker: Arc<CircuitBreaker>,
    fallback: FallbackResolver<S>,
    topic_pattern: String,
    publish_failures: AtomicU64,
    publish_failure_hook: Option<PublishFailureHook>,
}

impl<U, S, P> IngestQuoteUseCase<U, S, P>
where
    U: UpstreamQuotePort,
    S: QuoteStorePort,
    P: EventPublisherPort,
{
    /// Create a new IngestQuoteUseCase.
    pub fn new(
        upstream: Arc<U>,
        store: Arc<S>,
        publisher: Arc<P>,
        breaker: Arc<CircuitBreaker>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            fallback: FallbackResolver::new(Arc::clone(&store), settings.fallback_lookback),
            upstream,
            store,
            publisher,
            breaker,
            topic_pattern: settings.topic_pattern,
            publish_failures: AtomicU64::new(0),
            publish_failure_hook: None,
        }
    }

    /// Register a callback for swallowed publish failures.
    #[must_use]
    pub fn with_publish_failure_hook(mut self, hook: PublishFailureHook) -> Self {
        self.publish_failure_hook = Some(hook);
        self
    }

    /// The breaker guarding the upstream call.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Number of publish failures swallowed since startup.
    pub fn publish_failures(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }

    /// Ingest the latest quote for `symbol`.
    ///
    /// Returns the live quote when the upstream answers, otherwise a degraded
    /// quote from recent history.
    ///
    /// # Errors
    ///
    /// - [`IngestError::InvalidSymbol`] before any I/O
    /// - [`IngestError::Persistence`] when the live quote cannot be stored
    /// - [`IngestError::NoFallbackData`] / [`IngestError::FallbackStore`] when
    ///   the upstream is unavailable and history cannot stand in
    pub async fn ingest(&self, symbol: &Symbol) -> Result<Quote, IngestError> {
        let started = Instant::now();
        let result = self.run(symbol).await;

        let outcome = match &result {
            Ok(Sourced::Live(_)) => "live",
            Ok(Sourced::Degraded(_)) => "fallback",
            Err(_) => "error",
        };
        record_ingest(outcome, started.elapsed().as_secs_f64());

        result.map(|sourced| match sourced {
            Sourced::Live(quote) | Sourced::Degraded(quote) => quote,
        })
    }

    async fn run(&self, symbol: &Symbol) -> Result<Sourced, IngestError> {
        symbol.validate()?;

        let sourced = self
            .breaker
            .execute(
                async { self.upstream.fetch_quote(symbol).await.map(Sourced::Live) },
                |failure| async move {
                    tracing::warn!(
                        symbol = %symbol,
                        reason = failure.kind(),
                        error = %failure,
                        "Upstream unavailable, resolving fallback quote"
                    );
                    self.fallback.resolve(symbol).await.map(Sourced::Degraded)
                },
            )
            .await?;

        if let Sourced::Live(quote) = &sourced {
            self.persist(quote).await?;
            self.publish(quote.clone()).await;
        }

        Ok(sourced)
    }

    async fn persist(&self, quote: &Quote) -> Result<(), IngestError> {
        let record = NewHistoricalQuote::from_live_quote(quote);

        match self.store.save(record).await {
            Ok(id) => {
                tracing::debug!(symbol = %quote.symbol, record_id = %id, "Quote persisted");
                Ok(())
            }
            Err(e) => {
                record_persistence_failure();
                tracing::error!(symbol = %quote.symbol, error = %e, "Failed to persist quote");
                Err(IngestError::Persistence(e))
            }
        }
    }

    /// Publish without failing the caller.
    async fn publish(&self, quote: Quote) {
        let event = QuoteEvent::for_quote(&self.topic_pattern, quote);
        let topic = event.topic.clone();
        let key = event.key.clone();

        if let Err(error) = self.publisher.publish(event).await {
            self.publish_failures.fetch_add(1, Ordering::Relaxed);
            record_publish_failure(&topic);
            tracing::error!(topic = %topic, key = %key, error = %error, "Failed to publish quote");

            if let Some(hook) = &self.publish_failure_hook {
                hook(&PublishFailure { topic, key, error });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::UpstreamError;
    use crate::domain::market_data::{HistoricalQuoteRecord, RecordId};
    use crate::domain::shared::Timestamp;
    use crate::resilience::{CircuitBreakerConfig, CircuitBreakerState};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Mutex, RwLock};

    // ------------------------------------------------------------------
    // Mock ports
    // ------------------------------------------------------------------

    enum UpstreamBehavior {
        Quote(Decimal),
        Fail,
        Hang,
    }

    struct MockUpstream {
        behavior: UpstreamBehavior,
        calls: AtomicUsize,
    }

    impl MockUpstream {
        fn new(behavior: UpstreamBehavior) -> Self {
            Self {
                behavior,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UpstreamQuotePort for MockUpstream {
        async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                UpstreamBehavior::Quote(last) => Ok(Quote {
                    symbol: symbol.clone(),
                    timestamp: Timestamp::now(),
                    last,
                    bid: Some(dec!(191.2)),
                    ask: Some(dec!(191.25)),
                    volume: Some(1000),
                }),
                UpstreamBehavior::Fail => Err(UpstreamError::Network("connection refused".into())),
                UpstreamBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Err(UpstreamError::Timeout)
                }
            }
        }
    }

    #[derive(Default)]
    struct MockStore {
        records: RwLock<Vec<HistoricalQuoteRecord>>,
        fail_saves: bool,
    }

    impl MockStore {
        fn seed(&self, symbol: &str, minutes_ago: i64, close: Decimal) {
            self.records.write().unwrap().push(HistoricalQuoteRecord {
                id: RecordId::generate(),
                symbol: Symbol::new(symbol),
                timestamp: Timestamp::new(
                    chrono::Utc::now() - chrono::Duration::minutes(minutes_ago),
                ),
                open: close,
                high: close,
                low: close,
                close,
                volume: None,
                interval: "1m".to_string(),
            });
        }

        fn len(&self) -> usize {
            self.records.read().unwrap().len()
        }
    }

    #[async_trait]
    impl QuoteStorePort for MockStore {
        async fn save(&self, record: NewHistoricalQuote) -> Result<RecordId, QuoteStoreError> {
            if self.fail_saves {
                return Err(QuoteStoreError::WriteFailed {
                    message: "disk full".to_string(),
                });
            }
            let id = RecordId::generate();
            self.records
                .write()
                .unwrap()
                .push(record.with_id(id.clone()));
            Ok(id)
        }

        async fn query_range(
            &self,
            symbol: &Symbol,
            start: Timestamp,
            end: Timestamp,
        ) -> Result<Vec<HistoricalQuoteRecord>, QuoteStoreError> {
            let mut records: Vec<_> = self
                .records
                .read()
                .unwrap()
                .iter()
                .filter(|r| &r.symbol == symbol && r.timestamp >= start && r.timestamp <= end)
                .cloned()
                .collect();
            records.sort_by_key(|r| r.timestamp);
            Ok(records)
        }
    }

    #[derive(Default)]
    struct MockPublisher {
        events: Mutex<Vec<QuoteEvent>>,
        fail: bool,
    }

    impl MockPublisher {
        fn events(&self) -> Vec<QuoteEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventPublisherPort for MockPublisher {
        async fn publish(&self, event: QuoteEvent) -> Result<(), EventPublishError> {
            if self.fail {
                return Err(EventPublishError::ConnectionError {
                    message: "broker down".to_string(),
                });
            }
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn breaker() -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(
            "upstream",
            CircuitBreakerConfig {
                minimum_calls: 2,
                sliding_window_size: 2,
                wait_duration_in_open: Duration::from_secs(60),
                call_timeout: Duration::from_millis(100),
                ..Default::default()
            },
        ))
    }

    struct Harness {
        upstream: Arc<MockUpstream>,
        store: Arc<MockStore>,
        publisher: Arc<MockPublisher>,
        use_case: IngestQuoteUseCase<MockUpstream, MockStore, MockPublisher>,
    }

    fn harness(upstream: MockUpstream, store: MockStore, publisher: MockPublisher) -> Harness {
        let upstream = Arc::new(upstream);
        let store = Arc::new(store);
        let publisher = Arc::new(publisher);
        let use_case = IngestQuoteUseCase::new(
            Arc::clone(&upstream),
            Arc::clone(&store),
            Arc::clone(&publisher),
            breaker(),
            IngestSettings::default(),
        );
        Harness {
            upstream,
            store,
            publisher,
            use_case,
        }
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn live_quote_is_persisted_and_published() {
        let h = harness(
            MockUpstream::new(UpstreamBehavior::Quote(dec!(191.22))),
            MockStore::default(),
            MockPublisher::default(),
        );

        let quote = h.use_case.ingest(&Symbol::new("AAPL")).await.unwrap();

        assert_eq!(quote.symbol.as_str(), "AAPL");
        assert_eq!(quote.last, dec!(191.22));

        let records = h.store.records.read().unwrap().clone();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.open, dec!(191.22));
        assert_eq!(record.high, dec!(191.22));
        assert_eq!(record.low, dec!(191.22));
        assert_eq!(record.close, dec!(191.22));
        assert_eq!(record.interval, "1m");
        assert_eq!(record.timestamp, quote.timestamp);

        let events = h.publisher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].topic, "prices.AAPL");
        assert_eq!(events[0].key, "AAPL");
        assert_eq!(events[0].quote, quote);
    }

    #[tokio::test]
    async fn invalid_symbol_is_rejected_before_io() {
        let h = harness(
            MockUpstream::new(UpstreamBehavior::Quote(dec!(1))),
            MockStore::default(),
            MockPublisher::default(),
        );

        let err = h.use_case.ingest(&Symbol::new("")).await.unwrap_err();

        assert!(matches!(err, IngestError::InvalidSymbol(_)));
        assert_eq!(h.upstream.calls(), 0);
    }

    #[tokio::test]
    async fn upstream_failure_serves_history_without_side_effects() {
        let store = MockStore::default();
        store.seed("AAPL", 10, dec!(190.0));
        let h = harness(
            MockUpstream::new(UpstreamBehavior::Fail),
            store,
            MockPublisher::default(),
        );

        let quote = h.use_case.ingest(&Symbol::new("AAPL")).await.unwrap();

        assert_eq!(quote.last, dec!(190.0));
        assert_eq!(quote.bid, Some(dec!(190.0)));
        assert_eq!(quote.ask, Some(dec!(190.0)));
        assert_eq!(h.store.len(), 1);
        assert!(h.publisher.events().is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_without_history_fails() {
        let h = harness(
            MockUpstream::new(UpstreamBehavior::Fail),
            MockStore::default(),
            MockPublisher::default(),
        );

        let err = h.use_case.ingest(&Symbol::new("AAPL")).await.unwrap_err();

        assert!(matches!(err, IngestError::NoFallbackData { ref symbol } if symbol == "AAPL"));
    }

    #[tokio::test]
    async fn stale_history_outside_lookback_is_ignored() {
        let store = MockStore::default();
        store.seed("AAPL", 90, dec!(180.0));
        let h = harness(
            MockUpstream::new(UpstreamBehavior::Fail),
            store,
            MockPublisher::default(),
        );

        let err = h.use_case.ingest(&Symbol::new("AAPL")).await.unwrap_err();

        assert!(matches!(err, IngestError::NoFallbackData { .. }));
    }

    #[tokio::test]
    async fn open_breaker_skips_upstream() {
        let store = MockStore::default();
        store.seed("AAPL", 10, dec!(190.0));
        let h = harness(
            MockUpstream::new(UpstreamBehavior::Quote(dec!(191.22))),
            store,
            MockPublisher::default(),
        );
        h.use_case.breaker().force_open();

        let quote = h.use_case.ingest(&Symbol::new("AAPL")).await.unwrap();

        assert_eq!(quote.last, dec!(190.0));
        assert_eq!(h.upstream.calls(), 0);
        assert_eq!(h.store.len(), 1);
        assert!(h.publisher.events().is_empty());
    }

    #[tokio::test]
    async fn open_breaker_without_history_fails() {
        let h = harness(
            MockUpstream::new(UpstreamBehavior::Quote(dec!(191.22))),
            MockStore::default(),
            MockPublisher::default(),
        );
        h.use_case.breaker().force_open();

        let err = h.use_case.ingest(&Symbol::new("AAPL")).await.unwrap_err();

        assert!(matches!(err, IngestError::NoFallbackData { .. }));
        assert_eq!(h.upstream.calls(), 0);
    }

    #[tokio::test]
    async fn repeated_failures_trip_the_breaker() {
        let store = MockStore::default();
        store.seed("AAPL", 1, dec!(190.0));
        let h = harness(
            MockUpstream::new(UpstreamBehavior::Fail),
            store,
            MockPublisher::default(),
        );
        let symbol = Symbol::new("AAPL");

        h.use_case.ingest(&symbol).await.unwrap();
        h.use_case.ingest(&symbol).await.unwrap();
        assert_eq!(h.use_case.breaker().state(), CircuitBreakerState::Open);

        h.use_case.ingest(&symbol).await.unwrap();
        assert_eq!(h.upstream.calls(), 2);
    }

    #[tokio::test]
    async fn slow_upstream_times_out_into_fallback() {
        let store = MockStore::default();
        store.seed("AAPL", 1, dec!(190.0));
        let h = harness(
            MockUpstream::new(UpstreamBehavior::Hang),
            store,
            MockPublisher::default(),
        );

        let quote = h.use_case.ingest(&Symbol::new("AAPL")).await.unwrap();

        assert_eq!(quote.last, dec!(190.0));
        assert_eq!(h.use_case.breaker().metrics().total_failures, 1);
    }

    #[tokio::test]
    async fn persistence_failure_is_fatal_and_skips_publish() {
        let h = harness(
            MockUpstream::new(UpstreamBehavior::Quote(dec!(191.22))),
            MockStore {
                fail_saves: true,
                ..Default::default()
            },
            MockPublisher::default(),
        );

        let err = h.use_case.ingest(&Symbol::new("AAPL")).await.unwrap_err();

        assert!(matches!(err, IngestError::Persistence(_)));
        assert!(h.publisher.events().is_empty());
        // Persistence failures do not count against the upstream.
        assert_eq!(h.use_case.breaker().metrics().total_failures, 0);
    }

    #[tokio::test]
    async fn publish_failure_is_swallowed_and_observed() {
        let upstream = Arc::new(MockUpstream::new(UpstreamBehavior::Quote(dec!(191.22))));
        let store = Arc::new(MockStore::default());
        let publisher = Arc::new(MockPublisher {
            fail: true,
            ..Default::default()
        });
        let seen: Arc<Mutex<Vec<PublishFailure>>> = Arc::default();
        let hook_seen = Arc::clone(&seen);

        let use_case = IngestQuoteUseCase::new(
            upstream,
            Arc::clone(&store),
            publisher,
            breaker(),
            IngestSettings::default(),
        )
        .with_publish_failure_hook(Arc::new(move |failure: &PublishFailure| {
            hook_seen.lock().unwrap().push(failure.clone());
        }));

        let quote = use_case.ingest(&Symbol::new("AAPL")).await.unwrap();

        assert_eq!(quote.last, dec!(191.22));
        assert_eq!(store.len(), 1);
        assert_eq!(use_case.publish_failures(), 1);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].topic, "prices.AAPL");
        assert_eq!(seen[0].key, "AAPL");
    }

    #[tokio::test]
    async fn custom_topic_pattern_is_applied() {
        let upstream = Arc::new(MockUpstream::new(UpstreamBehavior::Quote(dec!(5))));
        let publisher = Arc::new(MockPublisher::default());
        let use_case = IngestQuoteUseCase::new(
            upstream,
            Arc::new(MockStore::default()),
            Arc::clone(&publisher),
            breaker(),
            IngestSettings {
                topic_pattern: "marketdata.quotes.{symbol}.v1".to_string(),
                ..Default::default()
            },
        );

        use_case.ingest(&Symbol::new("MSFT")).await.unwrap();

        assert_eq!(publisher.events()[0].topic, "marketdata.quotes.MSFT.v1");
    }
}
