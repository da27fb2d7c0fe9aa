//! Domain Layer
//!
//! The innermost layer containing business types with zero infrastructure dependencies.
//!
//! # Bounded Contexts
//!
//! - [`market_data`]: quotes, persisted history records and quote events
//! - [`shared`]: value objects and errors shared across contexts

pub mod market_data;
pub mod shared;
