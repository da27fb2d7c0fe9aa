//! Application Ports (Driven)
//!
//! Ports define how the application uses external systems.

mod event_publisher_port;
mod quote_store_port;
mod upstream_quote_port;

pub use event_publisher_port::{EventPublishError, EventPublisherPort, NoOpEventPublisher};
pub use quote_store_port::{QuoteStoreError, QuoteStorePort};
pub use upstream_quote_port::{UpstreamError, UpstreamQuotePort};
