// src/lib.rs
// Public library surface for the service binary, tools and integration tests.

pub mod api;
pub mod classify;
pub mod config;
pub mod engine;
pub mod history;
pub mod lead;
pub mod metrics;
pub mod normalize;
pub mod persist;
pub mod rank;
pub mod reconcile;

// Extraction boundary: search plan, sources, scheduler
pub mod ingest;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::classify::{score_text, Analysis};
pub use crate::config::EngineConfig;
pub use crate::engine::{LeadEngine, RunReport, Snapshot};
pub use crate::lead::{Classification, Lead, PostedDate, RunMetadata};
pub use crate::normalize::normalize_date;
pub use crate::reconcile::{merge, MergeOutcome, MergeReport, Store};
