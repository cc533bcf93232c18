//! Bulk ingestion.
//!
//! Records are checked against the stream's mapping before anything is
//! sent; only the ones that pass go into the bulk request, and the store's
//! per-item statuses are merged back by position. A malformed record never
//! aborts its batch, and nothing is retried here: a retried `create` could
//! duplicate log lines, so resubmission is left to the caller.

mod config;
mod result;

pub use config::IngestConfig;
pub use result::{BulkOutcome, BulkResult};

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use log_indexer_repository::{BulkRequest, DocumentStore, EntityKind, LifecycleError, Stream};
use log_indexer_shared::LogRecord;

/// Submits batches of records to a stream.
pub struct BulkIngestor {
    store: Arc<dyn DocumentStore>,
    config: IngestConfig,
}

impl BulkIngestor {
    /// Create an ingestor with the default batch limit.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_config(store, IngestConfig::default())
    }

    pub fn with_config(store: Arc<dyn DocumentStore>, config: IngestConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Submit `records` to `stream` as one bulk request.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkResult)` - One outcome per input record, in input order
    /// * `Err(LifecycleError::BatchSizeExceeded)` - If the batch is over the limit; nothing is sent
    /// * `Err(LifecycleError::StoreUnavailable)` - If the store could not take the request
    ///
    /// A request the store refuses as a whole, such as one over its size
    /// limit, rejects every record that was sent with the store's reason.
    #[instrument(skip(self, stream, records), fields(stream = %stream.name, count = records.len()))]
    pub async fn submit(
        &self,
        stream: &Stream,
        records: &[LogRecord],
    ) -> Result<BulkResult, LifecycleError> {
        if let Some(max) = self.config.max_batch_size {
            if records.len() > max {
                return Err(LifecycleError::batch_size_exceeded(records.len(), max));
            }
        }
        if records.is_empty() {
            return Ok(BulkResult::default());
        }

        let mapping = &stream.template.mapping;
        let timestamp_field = stream.timestamp_field();

        let mut outcomes: Vec<Option<BulkOutcome>> = Vec::with_capacity(records.len());
        let mut request = BulkRequest::new();
        let mut sent = Vec::new();
        for (position, record) in records.iter().enumerate() {
            match mapping.check(record, timestamp_field) {
                Ok(()) => {
                    request.push(&stream.name, record);
                    sent.push(position);
                    outcomes.push(None);
                }
                Err(violation) => {
                    debug!(position, reason = %violation, "Record failed validation");
                    outcomes.push(Some(BulkOutcome::Rejected(LifecycleError::record_rejected(
                        violation.to_string(),
                    ))));
                }
            }
        }

        if !request.is_empty() {
            let statuses = match self.store.bulk(&request).await {
                Ok(statuses) => statuses,
                Err(e) => {
                    let error = LifecycleError::from_store(e, EntityKind::Stream, &stream.name);
                    if error.is_unavailable() {
                        return Err(error);
                    }
                    // The store refused the request as a whole; every record
                    // in it shares that reason.
                    warn!(error = %error, records = sent.len(), "Bulk request rejected");
                    for position in sent {
                        outcomes[position] = Some(BulkOutcome::Rejected(error.clone()));
                    }
                    return Ok(Self::finish(outcomes));
                }
            };

            if statuses.len() != sent.len() {
                return Err(LifecycleError::UnexpectedResponse(format!(
                    "bulk response has {} items for {} records",
                    statuses.len(),
                    sent.len()
                )));
            }

            for (position, status) in sent.into_iter().zip(statuses) {
                outcomes[position] = Some(if status.is_success() {
                    BulkOutcome::Accepted
                } else {
                    let reason = status
                        .error
                        .unwrap_or_else(|| format!("store returned status {}", status.status));
                    BulkOutcome::Rejected(LifecycleError::record_rejected(reason))
                });
            }
        }

        Ok(Self::finish(outcomes))
    }

    fn finish(outcomes: Vec<Option<BulkOutcome>>) -> BulkResult {
        let result = BulkResult::new(outcomes.into_iter().flatten().collect());
        if result.is_complete() {
            info!(accepted = result.accepted_count(), "Bulk submission completed");
        } else {
            warn!(
                accepted = result.accepted_count(),
                rejected = result.rejected_count(),
                "Bulk submission completed with rejections"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use log_indexer_repository::{InMemoryStore, Policy, StoreError, StreamManager};
    use log_indexer_shared::{FieldType, Mapping, TimeValue};

    async fn provisioned() -> (Arc<InMemoryStore>, Stream) {
        let store = Arc::new(InMemoryStore::new());
        let policy =
            Policy::rollover_then_delete("logs", TimeValue::days(1), None, TimeValue::days(30))
                .unwrap();
        let mapping = Mapping::strict()
            .with_field("name", FieldType::Text)
            .with_field("ip_address", FieldType::Keyword);
        let stream = StreamManager::new(store.clone())
            .provision("logs", &policy, mapping)
            .await
            .unwrap();
        (store, stream)
    }

    fn record(name: &str) -> LogRecord {
        LogRecord::new()
            .with_field("name", name)
            .with_field("ip_address", "10.0.0.1")
            .with_timestamp(Utc::now())
    }

    #[tokio::test]
    async fn test_submit_all_valid() {
        let (store, stream) = provisioned().await;
        let ingestor = BulkIngestor::new(store.clone());
        let records: Vec<LogRecord> = (0..10).map(|i| record(&format!("user-{}", i))).collect();

        let result = ingestor.submit(&stream, &records).await.unwrap();

        assert_eq!(result.len(), 10);
        assert!(result.is_complete());
        assert_eq!(store.documents("logs").len(), 10);
    }

    #[tokio::test]
    async fn test_invalid_records_keep_position() {
        let (store, stream) = provisioned().await;
        let ingestor = BulkIngestor::new(store.clone());

        let mut missing_timestamp = record("b");
        missing_timestamp.remove("@timestamp");
        let records = vec![
            record("a"),
            missing_timestamp,
            record("c"),
            record("d").with_field("extra", "x"),
        ];

        let result = ingestor.submit(&stream, &records).await.unwrap();

        assert_eq!(result.len(), 4);
        assert_eq!(result.rejected_positions(), vec![1, 3]);
        assert_eq!(
            result.outcomes()[1],
            BulkOutcome::Rejected(LifecycleError::RecordRejected("missing timestamp".to_string()))
        );
        let resubmit = result.rejected_records(&records);
        assert_eq!(resubmit, vec![&records[1], &records[3]]);
        assert_eq!(store.documents("logs").len(), 2);
    }

    #[tokio::test]
    async fn test_store_item_failure_is_rejection() {
        let (store, stream) = provisioned().await;
        let ingestor = BulkIngestor::new(store.clone());

        // Sent to a stream the store refuses per item.
        let mut other = stream.clone();
        other.name = "metrics".to_string();

        let result = ingestor.submit(&other, &[record("a")]).await.unwrap();
        assert_eq!(result.rejected_count(), 1);
        assert!(matches!(
            result.outcomes()[0].reason(),
            Some(LifecycleError::RecordRejected(reason)) if reason.contains("index_not_found")
        ));
    }

    #[tokio::test]
    async fn test_batch_over_limit_sends_nothing() {
        let (store, stream) = provisioned().await;
        let before = store.request_count();
        let ingestor = BulkIngestor::with_config(store.clone(), IngestConfig::with_max_batch_size(2));

        let records = vec![record("a"), record("b"), record("c")];
        let err = ingestor.submit(&stream, &records).await.unwrap_err();

        assert_eq!(err, LifecycleError::batch_size_exceeded(3, 2));
        assert_eq!(store.request_count(), before);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (store, stream) = provisioned().await;
        let before = store.request_count();

        let result = BulkIngestor::new(store.clone()).submit(&stream, &[]).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(store.request_count(), before);
    }

    #[tokio::test]
    async fn test_store_unavailable_fails_whole_call() {
        let (store, stream) = provisioned().await;
        store.fail_next("bulk", StoreError::connection("connection reset"));

        let err = BulkIngestor::new(store.clone())
            .submit(&stream, &[record("a")])
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_refused_request_rejects_each_sent_record() {
        let (store, stream) = provisioned().await;
        store.fail_next(
            "bulk",
            StoreError::request_failed(413, "request entity too large"),
        );

        let mut missing_timestamp = record("b");
        missing_timestamp.remove("@timestamp");
        let records = vec![record("a"), missing_timestamp, record("c")];
        let result = BulkIngestor::new(store.clone())
            .submit(&stream, &records)
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.rejected_positions(), vec![0, 1, 2]);
        assert_eq!(
            result.outcomes()[0],
            BulkOutcome::Rejected(LifecycleError::StoreRejected {
                status: 413,
                reason: "request entity too large".to_string(),
            })
        );
        assert_eq!(
            result.outcomes()[1],
            BulkOutcome::Rejected(LifecycleError::RecordRejected("missing timestamp".to_string()))
        );
        assert!(store.documents("logs").is_empty());
    }

    #[tokio::test]
    async fn test_all_invalid_sends_nothing() {
        let (store, stream) = provisioned().await;
        let before = store.request_count();

        let records = vec![LogRecord::new().with_field("name", "no time")];
        let result = BulkIngestor::new(store.clone())
            .submit(&stream, &records)
            .await
            .unwrap();

        assert_eq!(result.rejected_count(), 1);
        assert_eq!(store.request_count(), before);
    }
}
