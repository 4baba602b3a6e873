// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod ingest;
pub mod ledger;
pub mod media;
pub mod metrics;
pub mod pipeline;
pub mod publish;
pub mod retry;
pub mod translate;

// ---- Re-exports for stable public API ----
pub use crate::config::Config;
pub use crate::pipeline::{Pipeline, RunReport};
pub use crate::publish::SinkStatus;
pub use crate::translate::Translation;
