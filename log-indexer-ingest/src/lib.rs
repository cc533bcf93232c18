//! # Log Indexer Ingest
//!
//! Writes log records into a provisioned data stream:
//!
//! - [`BulkIngestor`] validates a bounded batch against the stream's
//!   mapping and submits it as one bulk request, reporting a per-record
//!   outcome
//! - [`ContinuousIngestor`] paces single-record writes at a fixed interval
//!   until cancelled

pub mod bulk;
pub mod continuous;

pub use bulk::{BulkIngestor, BulkOutcome, BulkResult, IngestConfig};
pub use continuous::{ContinuousConfig, ContinuousIngestor, LoopSummary};
