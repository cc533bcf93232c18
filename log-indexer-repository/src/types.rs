//! Request and response types exchanged with the document store.

use serde::{Deserialize, Serialize};

use log_indexer_shared::LogRecord;

/// What the store reports about one data stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// The stream name.
    pub name: String,
    /// Name of the index template the stream was created from.
    pub template: String,
    /// Field the stream partitions documents on.
    pub timestamp_field: String,
    /// Incremented by every rollover.
    pub generation: u64,
    /// Backing index names, oldest first. The last one receives writes.
    pub indices: Vec<String>,
}

impl StreamInfo {
    /// The backing index currently receiving writes.
    pub fn write_index(&self) -> Option<&str> {
        self.indices.last().map(String::as_str)
    }
}

/// Operation kind of a bulk item.
///
/// Log streams are append-only, so `create` is the only kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulkOp {
    #[default]
    Create,
}

impl BulkOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
        }
    }
}

/// One entry of a bulk request.
#[derive(Debug, Clone, Copy)]
pub struct BulkItem<'a> {
    pub target: &'a str,
    pub op: BulkOp,
    pub record: &'a LogRecord,
}

/// An ordered batch of writes, submitted once.
#[derive(Debug, Clone, Default)]
pub struct BulkRequest<'a> {
    items: Vec<BulkItem<'a>>,
}

impl<'a> BulkRequest<'a> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a request that creates every record in `target`.
    pub fn create_all<I>(target: &'a str, records: I) -> Self
    where
        I: IntoIterator<Item = &'a LogRecord>,
    {
        let items = records
            .into_iter()
            .map(|record| BulkItem {
                target,
                op: BulkOp::Create,
                record,
            })
            .collect();
        Self { items }
    }

    pub fn push(&mut self, target: &'a str, record: &'a LogRecord) {
        self.items.push(BulkItem {
            target,
            op: BulkOp::Create,
            record,
        });
    }

    pub fn items(&self) -> &[BulkItem<'a>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Store-reported status of one bulk item, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStatus {
    /// HTTP-style status of the item (201 when created).
    pub status: u16,
    /// Error type and reason when the item was refused.
    pub error: Option<String>,
}

impl ItemStatus {
    pub fn created() -> Self {
        Self {
            status: 201,
            error: None,
        }
    }

    pub fn failed(status: u16, error: impl Into<String>) -> Self {
        Self {
            status,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_create_all_keeps_order() {
        let records: Vec<LogRecord> = (0..3)
            .map(|i| LogRecord::new().with_field("seq", i).with_timestamp(Utc::now()))
            .collect();

        let request = BulkRequest::create_all("logs_hss", &records);

        assert_eq!(request.len(), 3);
        for (i, item) in request.items().iter().enumerate() {
            assert_eq!(item.target, "logs_hss");
            assert_eq!(item.op, BulkOp::Create);
            assert_eq!(item.record.get("seq"), Some(&serde_json::json!(i)));
        }
    }

    #[test]
    fn test_item_status() {
        assert!(ItemStatus::created().is_success());
        assert!(!ItemStatus::failed(400, "mapper_parsing_exception").is_success());
    }

    #[test]
    fn test_write_index_is_latest() {
        let info = StreamInfo {
            name: "logs".to_string(),
            template: "logs".to_string(),
            timestamp_field: "@timestamp".to_string(),
            generation: 2,
            indices: vec![
                ".ds-logs-000001".to_string(),
                ".ds-logs-000002".to_string(),
            ],
        };
        assert_eq!(info.write_index(), Some(".ds-logs-000002"));
    }
}
