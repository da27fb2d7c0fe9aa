//! Ingestion Pipeline Integration Tests
//!
//! Drives the real adapters (reqwest fetcher, in-memory store, broadcast
//! publisher) against a mock upstream provider.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use marketdata_service::application::use_cases::PublishFailure;
use marketdata_service::{
    BroadcastEventPublisher, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerState,
    HistoricalQuoteRecord, HttpQuoteFetcher, HttpQuoteFetcherConfig, InMemoryQuoteStore,
    IngestError, IngestQuoteUseCase, IngestSettings, QuoteStorePort, RecordId, Symbol, Timestamp,
};

type Pipeline = IngestQuoteUseCase<HttpQuoteFetcher, InMemoryQuoteStore, BroadcastEventPublisher>;

struct Harness {
    store: Arc<InMemoryQuoteStore>,
    publisher: Arc<BroadcastEventPublisher>,
    pipeline: Pipeline,
}

fn harness(server: &MockServer, breaker: CircuitBreakerConfig) -> Harness {
    let fetcher = HttpQuoteFetcher::new(&HttpQuoteFetcherConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(2),
        ..Default::default()
    })
    .unwrap();
    let store = Arc::new(InMemoryQuoteStore::new());
    let publisher = Arc::new(BroadcastEventPublisher::new(16));

    let pipeline = IngestQuoteUseCase::new(
        Arc::new(fetcher),
        Arc::clone(&store),
        Arc::clone(&publisher),
        Arc::new(CircuitBreaker::new("upstream", breaker)),
        IngestSettings::default(),
    );

    Harness {
        store,
        publisher,
        pipeline,
    }
}

fn seed(store: &InMemoryQuoteStore, symbol: &str, minutes_ago: i64, close: Decimal) {
    store.add(HistoricalQuoteRecord {
        id: RecordId::generate(),
        symbol: Symbol::new(symbol),
        timestamp: Timestamp::new(Utc::now() - chrono::Duration::minutes(minutes_ago)),
        open: close,
        high: close,
        low: close,
        close,
        volume: None,
        interval: "1m".to_string(),
    });
}

async fn mount_quote(server: &MockServer, symbol: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/quote/{symbol}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "price": "191.22",
            "bid": 191.2,
            "ask": 191.25,
            "volume": 1000
        })))
        .mount(server)
        .await;
}

fn small_window(wait: Duration) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        sliding_window_size: 4,
        minimum_calls: 4,
        wait_duration_in_open: wait,
        ..Default::default()
    }
}

#[tokio::test]
async fn live_quote_is_stored_and_published() {
    let server = MockServer::start().await;
    mount_quote(&server, "AAPL").await;
    let h = harness(&server, CircuitBreakerConfig::default());
    let mut rx = h.publisher.subscribe();

    let quote = h.pipeline.ingest(&Symbol::new("AAPL")).await.unwrap();

    assert_eq!(quote.symbol.as_str(), "AAPL");
    assert_eq!(quote.last, dec!(191.22));
    assert_eq!(quote.bid, Some(dec!(191.2)));
    assert_eq!(quote.ask, Some(dec!(191.25)));
    assert_eq!(quote.volume, Some(1000));

    let window = Duration::from_secs(1);
    let stored = h
        .store
        .query_range(
            &Symbol::new("AAPL"),
            quote.timestamp.minus(window),
            Timestamp::now(),
        )
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    let record = &stored[0];
    assert!(
        [record.open, record.high, record.low, record.close]
            .iter()
            .all(|p| *p == dec!(191.22))
    );
    assert_eq!(record.volume, Some(1000));

    let event = rx.recv().await.unwrap();
    assert_eq!(event.key, "AAPL");
    assert_eq!(event.topic, "prices.AAPL");
    assert_eq!(event.quote, quote);
}

#[tokio::test]
async fn failing_upstream_serves_degraded_quote() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let h = harness(&server, CircuitBreakerConfig::default());
    seed(&h.store, "AAPL", 10, dec!(190.0));
    let mut rx = h.publisher.subscribe();

    let quote = h.pipeline.ingest(&Symbol::new("AAPL")).await.unwrap();

    assert_eq!(quote.last, dec!(190.0));
    assert_eq!(quote.bid, Some(dec!(190.0)));
    assert_eq!(quote.ask, Some(dec!(190.0)));
    assert_eq!(h.store.len(), 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn failing_upstream_without_history_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let h = harness(&server, CircuitBreakerConfig::default());
    seed(&h.store, "MSFT", 10, dec!(400.0));

    let err = h.pipeline.ingest(&Symbol::new("AAPL")).await.unwrap_err();

    assert!(matches!(err, IngestError::NoFallbackData { .. }));
}

#[tokio::test]
async fn open_breaker_stops_calling_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let h = harness(&server, small_window(Duration::from_secs(60)));
    seed(&h.store, "AAPL", 1, dec!(190.0));
    let symbol = Symbol::new("AAPL");

    for _ in 0..6 {
        let quote = h.pipeline.ingest(&symbol).await.unwrap();
        assert_eq!(quote.last, dec!(190.0));
    }

    assert_eq!(h.pipeline.breaker().state(), CircuitBreakerState::Open);
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
    assert_eq!(h.pipeline.breaker().metrics().not_permitted_calls, 2);
}

#[tokio::test]
async fn breaker_recovers_after_cool_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(4)
        .mount(&server)
        .await;
    mount_quote(&server, "AAPL").await;
    let h = harness(&server, small_window(Duration::from_millis(100)));
    seed(&h.store, "AAPL", 1, dec!(190.0));
    let symbol = Symbol::new("AAPL");

    for _ in 0..4 {
        h.pipeline.ingest(&symbol).await.unwrap();
    }
    assert_eq!(h.pipeline.breaker().state(), CircuitBreakerState::Open);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(h.pipeline.breaker().state(), CircuitBreakerState::HalfOpen);

    let quote = h.pipeline.ingest(&symbol).await.unwrap();

    assert_eq!(quote.last, dec!(191.22));
    assert_eq!(h.pipeline.breaker().state(), CircuitBreakerState::Closed);
    assert_eq!(h.store.len(), 2);
}

#[tokio::test]
async fn publish_failure_still_returns_live_quote() {
    let server = MockServer::start().await;
    mount_quote(&server, "AAPL").await;
    let h = harness(&server, CircuitBreakerConfig::default());
    h.publisher.close();

    let failures = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&failures);
    let pipeline = h
        .pipeline
        .with_publish_failure_hook(Arc::new(move |_: &PublishFailure| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

    let quote = pipeline.ingest(&Symbol::new("AAPL")).await.unwrap();

    assert_eq!(quote.last, dec!(191.22));
    assert_eq!(h.store.len(), 1);
    assert_eq!(pipeline.publish_failures(), 1);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_ingests_for_many_symbols() {
    let server = MockServer::start().await;
    for symbol in ["AAPL", "MSFT", "TSLA", "NVDA"] {
        mount_quote(&server, symbol).await;
    }
    let h = Arc::new(harness(&server, CircuitBreakerConfig::default()));

    let handles: Vec<_> = ["AAPL", "MSFT", "TSLA", "NVDA"]
        .into_iter()
        .map(|symbol| {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.pipeline.ingest(&Symbol::new(symbol)).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(h.store.len(), 4);
    assert_eq!(h.pipeline.breaker().metrics().total_failures, 0);
}

#[tokio::test]
async fn symbols_with_reserved_characters_reach_the_upstream_encoded() {
    let server = MockServer::start().await;
    mount_quote(&server, "BTC%2FUSD").await;
    mount_quote(&server, "BRK%20B").await;
    mount_quote(&server, "TSE:7203").await;
    let h = harness(&server, CircuitBreakerConfig::default());

    for raw in ["BTC/USD", "BRK B", "TSE:7203"] {
        let quote = h.pipeline.ingest(&Symbol::new(raw)).await.unwrap();
        assert_eq!(quote.symbol.as_str(), raw);
        assert_eq!(quote.last, dec!(191.22));
    }

    let requests = server.received_requests().await.unwrap();
    let paths: Vec<_> = requests.iter().map(|r| r.url.path().to_string()).collect();
    assert_eq!(
        paths,
        vec![
            "/api/quote/BTC%2FUSD",
            "/api/quote/BRK%20B",
            "/api/quote/TSE:7203"
        ]
    );
    assert_eq!(h.store.len(), 3);
}
