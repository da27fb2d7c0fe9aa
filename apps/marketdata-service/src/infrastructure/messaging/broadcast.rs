//! Broadcast Event Publisher
//!
//! Fans quote events out to in-process subscribers over a tokio broadcast
//! channel. Subscribers filter by `topic`/`key` as they see fit.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::application::ports::{EventPublishError, EventPublisherPort};
use crate::domain::market_data::QuoteEvent;

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// Event publisher backed by `tokio::sync::broadcast`.
///
/// Publishing with no subscribers is not an error: the event is dropped, as
/// a message bus would retain nothing for a topic nobody consumes. Slow
/// subscribers lag and lose the oldest events once `capacity` is exceeded.
#[derive(Debug)]
pub struct BroadcastEventPublisher {
    tx: broadcast::Sender<QuoteEvent>,
    closed: AtomicBool,
    published: AtomicU64,
}

impl BroadcastEventPublisher {
    /// Create a publisher with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity.max(1)).0,
            closed: AtomicBool::new(false),
            published: AtomicU64::new(0),
        }
    }

    /// Get a new receiver for quote events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<QuoteEvent> {
        self.tx.subscribe()
    }

    /// Get the number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Number of events accepted since startup.
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Stop accepting events. Subsequent publishes fail with `Closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        tracing::info!("Event publisher closed");
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl EventPublisherPort for BroadcastEventPublisher {
    async fn publish(&self, event: QuoteEvent) -> Result<(), EventPublishError> {
        if self.is_closed() {
            return Err(EventPublishError::Closed);
        }

        let topic = event.topic.clone();
        let receivers = self.tx.send(event).unwrap_or(0);
        self.published.fetch_add(1, Ordering::Relaxed);

        tracing::trace!(topic = %topic, receivers, "Quote event published");
        Ok(())
    }
}
