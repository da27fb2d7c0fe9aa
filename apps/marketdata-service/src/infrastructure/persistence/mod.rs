//! Persistence Adapters
//!
//! Implementations of the quote store port.

pub mod in_memory;

pub use in_memory::InMemoryQuoteStore;
