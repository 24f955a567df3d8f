// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod dedup;
pub mod ingest;
pub mod metrics;
pub mod relevance;
pub mod report;

// ---- Re-exports for stable public API ----
pub use crate::config::MonitorConfig;
pub use crate::dedup::{dedupe, token_set_ratio, DedupParams, NearDuplicateFilter};
pub use crate::ingest::types::{Fetcher, Item, RawEntry, Source, SourceError, SourceKind};
pub use crate::ingest::{Aggregator, RunSummary};
pub use crate::relevance::KeywordMatcher;
pub use crate::report::Report;
