//! Application Layer
//!
//! The application layer orchestrates domain logic through use cases.
//! It defines:
//!
//! - **Ports**: Interfaces for the upstream provider, quote store and event bus
//! - **Services**: Reusable application logic (fallback resolution)
//! - **Use Cases**: Ingestion and history queries

pub mod ports;
pub mod services;
pub mod use_cases;

pub use ports::*;
pub use services::*;
pub use use_cases::*;
