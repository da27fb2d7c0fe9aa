//! Event Publisher Port (Driven Port)
//!
//! Interface for publishing quote events to the event bus.

use async_trait::async_trait;

use crate::domain::market_data::QuoteEvent;

/// Event publishing error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventPublishError {
    /// Connection error.
    #[error("Event publish connection error: {message}")]
    ConnectionError {
        /// Error detail.
        message: String,
    },

    /// Serialization error.
    #[error("Event serialization error: {message}")]
    SerializationError {
        /// Error detail.
        message: String,
    },

    /// Publishing failed.
    #[error("Event publish failed: {message}")]
    PublishFailed {
        /// Error detail.
        message: String,
    },

    /// Publisher has been shut down.
    #[error("Event publisher is closed")]
    Closed,
}

/// Port for publishing quote events.
#[async_trait]
pub trait EventPublisherPort: Send + Sync {
    /// Publish a single quote event to its topic, keyed by `event.key`.
    async fn publish(&self, event: QuoteEvent) -> Result<(), EventPublishError>;
}

/// No-op event publisher for wiring without a bus.
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisherPort for NoOpEventPublisher {
    async fn publish(&self, _event: QuoteEvent) -> Result<(), EventPublishError> {
        Ok(())
    }
}
