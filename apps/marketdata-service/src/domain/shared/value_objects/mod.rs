//! Value Objects
//!
//! Immutable domain types compared by value.

mod symbol;
mod timestamp;

pub use symbol::Symbol;
pub use timestamp::Timestamp;
