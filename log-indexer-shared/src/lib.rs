//! # Log Indexer Shared
//!
//! Plain data types shared by the log indexer crates: the records written
//! into a stream, the mapping they are checked against, the unit strings
//! used by lifecycle policies, and the read-side shapes returned by the
//! document store.

pub mod mapping;
pub mod record;
pub mod source;
pub mod stats;
pub mod units;

pub use mapping::{FieldType, Mapping, RecordViolation};
pub use record::{LogRecord, DEFAULT_TIMESTAMP_FIELD};
pub use source::RecordSource;
pub use stats::{SearchResponse, StreamStats};
pub use units::{ByteSize, ByteUnit, TimeUnit, TimeValue, UnitParseError};
