//! Application use cases.

mod ingest_quote;
mod query_history;

pub use ingest_quote::{
    IngestError, IngestQuoteUseCase, IngestSettings, PublishFailure, PublishFailureHook,
};
pub use query_history::{HistoryError, QueryHistoryUseCase};
