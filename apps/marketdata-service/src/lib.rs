// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Market Data Service - Rust Core Library
//!
//! Resilient quote ingestion for the Cream trading system.
//!
//! # Architecture (Clean Architecture + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: quotes, historical records, symbols and timestamps
//!   - `market_data`: `Quote`, `HistoricalQuoteRecord`, `QuoteEvent`
//!   - `shared`: value objects and domain errors
//!
//! - **Application**: use cases and orchestration
//!   - `ports`: interfaces for the upstream provider, quote store and event bus
//!   - `services`: `FallbackResolver`
//!   - `use_cases`: `IngestQuote`, `QueryHistory`
//!
//! - **Infrastructure**: adapters
//!   - `upstream`: reqwest-based quote fetcher
//!   - `persistence`: in-memory quote store
//!   - `messaging`: broadcast-channel event publisher
//!   - `http`: axum REST API
//!
//! - **Resilience**: circuit breaker guarding the upstream call
//!
//! # Control Flow
//!
//! ```text
//! caller → IngestQuoteUseCase → CircuitBreaker
//!            ├─ fetch ok      → persist → publish → Quote
//!            └─ failure/open  → FallbackResolver  → degraded Quote
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting Concerns
// =============================================================================

/// Configuration loading and validation.
pub mod config;

/// Metrics and tracing.
pub mod observability;

/// Circuit breaker for upstream calls.
pub mod resilience;

// =============================================================================
// Re-exports
// =============================================================================

pub use domain::market_data::{HistoricalQuoteRecord, NewHistoricalQuote, Quote, QuoteEvent, RecordId};
pub use domain::shared::{DomainError, Symbol, Timestamp};

pub use application::ports::{
    EventPublishError, EventPublisherPort, NoOpEventPublisher, QuoteStoreError, QuoteStorePort,
    UpstreamError, UpstreamQuotePort,
};
pub use application::services::{FallbackError, FallbackResolver};
pub use application::use_cases::{
    HistoryError, IngestError, IngestQuoteUseCase, IngestSettings, QueryHistoryUseCase,
};

pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::messaging::BroadcastEventPublisher;
pub use infrastructure::persistence::InMemoryQuoteStore;
pub use infrastructure::upstream::{HttpQuoteFetcher, HttpQuoteFetcherConfig};

pub use resilience::{CallFailure, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerState};
