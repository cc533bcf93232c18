//! Log record type written into a data stream.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field that carries the event time unless a template names another one.
pub const DEFAULT_TIMESTAMP_FIELD: &str = "@timestamp";

/// A single structured log record.
///
/// A record is a flat map of field name to JSON value. It serializes as the
/// bare map so it can be sent to the store as the document source without a
/// copy. Whether the record is acceptable for a given stream is decided by
/// [`Mapping::check`](crate::Mapping::check), not at construction time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogRecord {
    fields: Map<String, Value>,
}

impl LogRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set the event time under [`DEFAULT_TIMESTAMP_FIELD`].
    pub fn with_timestamp(self, timestamp: DateTime<Utc>) -> Self {
        self.with_timestamp_field(DEFAULT_TIMESTAMP_FIELD, timestamp)
    }

    /// Set the event time under a custom field name.
    pub fn with_timestamp_field(self, field: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let formatted = timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        self.with_field(field, formatted)
    }

    /// Insert a field in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Remove a field, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for LogRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}
