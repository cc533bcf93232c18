//! End-to-end scenarios over the in-memory store: provision a stream, load
//! it in bulk, feed it continuously and tear it down.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use log_indexer_ingest::{BulkIngestor, BulkOutcome, ContinuousConfig, ContinuousIngestor};
use log_indexer_repository::lifecycle::IndexFacts;
use log_indexer_repository::{
    InMemoryStore, LifecycleError, PatternMode, Policy, Stream, StreamManager, StreamManagerConfig,
    StreamStatus,
};
use log_indexer_shared::{FieldType, LogRecord, Mapping, TimeValue, DEFAULT_TIMESTAMP_FIELD};
use mock_log_source::{MockLogConfig, MockLogSource};

fn hss_policy() -> Policy {
    Policy::rollover_then_delete("logs_hss", TimeValue::days(1), None, TimeValue::days(30)).unwrap()
}

fn hss_mapping() -> Mapping {
    Mapping::strict()
        .with_field("name", FieldType::Text)
        .with_field("ip_address", FieldType::Keyword)
}

fn hss_record(i: usize) -> LogRecord {
    LogRecord::new()
        .with_field("name", format!("user-{}", i))
        .with_field("ip_address", format!("10.0.{}.{}", i / 256 % 256, i % 256))
        .with_timestamp(Utc::now())
}

async fn provisioned(store: &Arc<InMemoryStore>) -> (StreamManager, Stream) {
    let manager = StreamManager::new(store.clone());
    let stream = manager
        .provision("logs_hss", &hss_policy(), hss_mapping())
        .await
        .unwrap();
    (manager, stream)
}

#[test]
fn test_policy_transition_table() {
    let policy = hss_policy();

    let table = policy.transition_table();
    assert_eq!(table.len(), 1);
    for edge in &table {
        assert!(policy.state(&edge.to).is_some());
    }
    assert_eq!(table[0].from, "rollover");
    assert_eq!(table[0].to, "delete");

    let delete = policy.state("delete").unwrap();
    assert!(delete.transitions.is_empty());

    let young = IndexFacts::aged(Duration::from_secs(86_400));
    let old = IndexFacts::aged(Duration::from_secs(31 * 86_400));
    assert_eq!(policy.next_state("rollover", &young), None);
    assert_eq!(policy.next_state("rollover", &old), Some("delete"));
    assert_eq!(policy.next_state("delete", &old), None);
}

#[tokio::test]
async fn test_bulk_load_of_well_formed_records() {
    let store = Arc::new(InMemoryStore::new());
    let (manager, stream) = provisioned(&store).await;
    let records: Vec<LogRecord> = (0..1000).map(hss_record).collect();

    let result = BulkIngestor::new(store.clone())
        .submit(&stream, &records)
        .await
        .unwrap();

    assert_eq!(result.len(), 1000);
    assert_eq!(result.accepted_count(), 1000);
    assert!(result.is_complete());

    let stats = manager.stats("logs_hss").await.unwrap();
    assert_eq!(stats.document_count, 1000);
    assert_eq!(manager.describe("logs_hss").await.unwrap().status, StreamStatus::Active);
}

#[tokio::test]
async fn test_bulk_rejections_keep_order() {
    let store = Arc::new(InMemoryStore::new());
    let (_, stream) = provisioned(&store).await;

    let invalid = [2usize, 5, 9];
    let records: Vec<LogRecord> = (0..12)
        .map(|i| {
            let record = hss_record(i);
            if invalid.contains(&i) {
                record.with_field("email", "someone@example.com")
            } else {
                record
            }
        })
        .collect();

    let result = BulkIngestor::new(store.clone())
        .submit(&stream, &records)
        .await
        .unwrap();

    assert_eq!(result.len(), 12);
    assert_eq!(result.rejected_count(), 3);
    assert_eq!(result.rejected_positions(), invalid.to_vec());

    let resubmit = result.rejected_records(&records);
    assert_eq!(resubmit.len(), 3);
    assert!(resubmit.iter().all(|record| record.contains("email")));
    assert_eq!(store.documents("logs_hss").len(), 9);
}

#[tokio::test]
async fn test_missing_timestamp_rejected_alone() {
    let store = Arc::new(InMemoryStore::new());
    let (_, stream) = provisioned(&store).await;

    let mut records: Vec<LogRecord> = (0..3).map(hss_record).collect();
    records[1].remove(DEFAULT_TIMESTAMP_FIELD);

    let result = BulkIngestor::new(store.clone())
        .submit(&stream, &records)
        .await
        .unwrap();

    let outcomes = result.outcomes();
    assert!(outcomes[0].is_accepted());
    assert_eq!(
        outcomes[1],
        BulkOutcome::Rejected(LifecycleError::RecordRejected("missing timestamp".to_string()))
    );
    assert!(outcomes[2].is_accepted());
    assert_eq!(store.documents("logs_hss").len(), 2);
}

#[tokio::test]
async fn test_provision_twice_is_idempotent() {
    let store = Arc::new(InMemoryStore::new());
    let (manager, first) = provisioned(&store).await;

    let second = manager
        .provision("logs_hss", &hss_policy(), hss_mapping())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(store.policy_count(), 1);
}

#[tokio::test]
async fn test_teardown_waits_for_dependent_streams() {
    let store = Arc::new(InMemoryStore::new());
    let manager = StreamManager::with_config(
        store.clone(),
        StreamManagerConfig::default().with_pattern(PatternMode::Prefix),
    );
    manager
        .provision("logs_hss", &hss_policy(), hss_mapping())
        .await
        .unwrap();
    manager.create_stream("logs_hss-archive").await.unwrap();

    let err = manager.teardown("logs_hss").await.unwrap_err();
    assert!(matches!(
        err.root_cause(),
        LifecycleError::HasDependentStream { streams, .. } if streams == &vec!["logs_hss-archive".to_string()]
    ));
    assert!(store.stream("logs_hss").is_some());

    manager.delete_stream("logs_hss-archive").await.unwrap();
    let stream = manager.teardown("logs_hss").await.unwrap();
    assert_eq!(stream.status, StreamStatus::Deleted);
    assert!(store.template("logs_hss").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_loop_cancelled_after_third_tick() {
    let store = Arc::new(InMemoryStore::new());
    let (_, stream) = provisioned(&store).await;
    let ingestor = ContinuousIngestor::with_config(
        store.clone(),
        ContinuousConfig::with_interval(Duration::from_millis(300)).max_ticks(5),
    );
    let mut source = (0..5).map(hss_record);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(750)).await;
        trigger.cancel();
    });

    let summary = ingestor.run(&stream, &mut source, &cancel).await;

    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.written, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(store.documents("logs_hss").len(), 3);
}

#[tokio::test]
async fn test_generated_records_fit_full_mapping() {
    let store = Arc::new(InMemoryStore::new());
    let mapping = Mapping::strict()
        .with_field("name", FieldType::Text)
        .with_field("address", FieldType::Text)
        .with_field("phone_number", FieldType::Keyword)
        .with_field("email", FieldType::Keyword)
        .with_field("ip_address", FieldType::Keyword);
    let stream = StreamManager::new(store.clone())
        .provision("logs_hss", &hss_policy(), mapping)
        .await
        .unwrap();

    let records: Vec<LogRecord> =
        MockLogSource::new(MockLogConfig::deterministic().with_limit(200)).collect();
    let result = BulkIngestor::new(store.clone())
        .submit(&stream, &records)
        .await
        .unwrap();

    assert!(result.is_complete());
    assert_eq!(store.documents("logs_hss").len(), 200);
}
