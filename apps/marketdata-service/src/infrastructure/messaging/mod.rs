//! Messaging Adapters
//!
//! Implementations of the event publisher port.

pub mod broadcast;

pub use broadcast::BroadcastEventPublisher;
