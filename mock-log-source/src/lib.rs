//! Synthetic log records for testing and load generation.
//!
//! [`MockLogSource`] yields people-like access log records with a name,
//! postal address, phone number, email, IPv4 address and `@timestamp`. It
//! is an iterator of [`LogRecord`](log_indexer_shared::LogRecord), so it can
//! be collected into a bulk batch or handed to the continuous ingestion loop
//! as a record source.
//!
//! # Usage
//!
//! ## Deterministic Testing
//!
//! ```rust
//! use mock_log_source::{MockLogConfig, MockLogSource};
//!
//! let first: Vec<_> = MockLogSource::new(MockLogConfig::deterministic()).take(3).collect();
//! let again: Vec<_> = MockLogSource::new(MockLogConfig::deterministic()).take(3).collect();
//! assert_eq!(first.len(), 3);
//! assert_eq!(first[0].get("email"), again[0].get("email"));
//! ```
//!
//! ## Backfill
//!
//! ```rust
//! use mock_log_source::{MockLogConfig, MockLogSource, TimestampMode};
//!
//! let backfill: Vec<_> = MockLogSource::new(
//!     MockLogConfig::default()
//!         .with_timestamps(TimestampMode::ThisMonth)
//!         .with_limit(1000),
//! )
//! .collect();
//! assert_eq!(backfill.len(), 1000);
//! ```

mod generator;

pub use generator::{MockLogConfig, MockLogSource, TimestampMode, GENERATED_FIELDS};
