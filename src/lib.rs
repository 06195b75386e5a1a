// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod announce;
pub mod api;
pub mod bootstrap;
pub mod config;
pub mod dedup;
pub mod error;
pub mod history;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod publish;
pub mod render;
pub mod scheduler;
pub mod synth;

/// Sent on every outbound HTTP request.
pub const USER_AGENT: &str = concat!("aurore-pipeline/", env!("CARGO_PKG_VERSION"));

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::bootstrap::build_pipeline;
pub use crate::config::{PipelineConfig, Secrets};
pub use crate::error::PipelineError;
pub use crate::pipeline::{Pipeline, RunOutcome, RunReport, Stage};
