//! Infrastructure Layer
//!
//! This module contains all adapters (implementations) for the ports defined
//! in the application layer. Following hexagonal architecture:
//!
//! - **Driven Adapters (Outbound)**: Implement ports for external systems
//!   - `upstream/`: Quote provider over HTTP
//!   - `persistence/`: Quote history store
//!   - `messaging/`: Event publishing adapters
//!
//! - **Driver Adapters (Inbound)**: Expose application to external world
//!   - `http/`: REST API controllers

pub mod http;
pub mod messaging;
pub mod persistence;
pub mod upstream;
