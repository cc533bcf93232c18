//! The indexer run: provision the stream, backfill it, then keep it fed.

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config::Settings;
use crate::IndexerError;
use log_indexer_ingest::{BulkIngestor, ContinuousConfig, ContinuousIngestor, LoopSummary};
use log_indexer_repository::{DocumentStore, LifecycleError, Policy, Stream, StreamManager};
use log_indexer_shared::{FieldType, LogRecord, Mapping, RecordSource};
use mock_log_source::{MockLogConfig, MockLogSource, TimestampMode};

/// Totals of the initial bulk load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub batches: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Drives one stream through provisioning, backfill, live ingestion and
/// optional teardown.
pub struct Indexer {
    settings: Settings,
    streams: StreamManager,
    bulk: BulkIngestor,
    continuous: ContinuousIngestor,
}

impl Indexer {
    pub fn new(store: Arc<dyn DocumentStore>, settings: Settings) -> Self {
        let continuous = ContinuousIngestor::with_config(
            store.clone(),
            ContinuousConfig::with_interval(settings.ingest_interval),
        );
        Self {
            streams: StreamManager::new(store.clone()),
            bulk: BulkIngestor::new(store),
            continuous,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn streams(&self) -> &StreamManager {
        &self.streams
    }

    /// Rollover then delete, named after the stream.
    pub fn policy(&self) -> Result<Policy, LifecycleError> {
        Policy::rollover_then_delete(
            &self.settings.stream_name,
            self.settings.rollover_age,
            Some(self.settings.rollover_min_size),
            self.settings.retention,
        )
    }

    /// Mapping covering every field the mock record source emits.
    pub fn mapping() -> Mapping {
        Mapping::strict()
            .with_field("name", FieldType::Text)
            .with_field("address", FieldType::Text)
            .with_field("phone_number", FieldType::Keyword)
            .with_field("email", FieldType::Keyword)
            .with_field("ip_address", FieldType::Keyword)
    }

    /// Register the policy and template and create the stream.
    pub async fn provision(&self) -> Result<Stream, IndexerError> {
        let policy = self.policy()?;
        let stream = self
            .streams
            .provision(&self.settings.stream_name, &policy, Self::mapping())
            .await?;
        info!(
            stream = %stream.name,
            status = %stream.status,
            generation = stream.generation,
            "Data stream ready"
        );
        Ok(stream)
    }

    /// Submit `records` in batches no larger than the bulk limit.
    #[instrument(skip(self, stream, records), fields(stream = %stream.name, count = records.len()))]
    pub async fn backfill(
        &self,
        stream: &Stream,
        records: &[LogRecord],
    ) -> Result<BackfillReport, IndexerError> {
        let chunk = self
            .bulk
            .config()
            .max_batch_size
            .unwrap_or(records.len())
            .max(1);

        let mut report = BackfillReport::default();
        for (index, batch) in records.chunks(chunk).enumerate() {
            let result = self.bulk.submit(stream, batch).await?;
            report.batches += 1;
            report.accepted += result.accepted_count();
            report.rejected += result.rejected_count();

            for (offset, outcome) in result.outcomes().iter().enumerate() {
                if let Some(reason) = outcome.reason() {
                    warn!(position = index * chunk + offset, reason = %reason, "Record rejected");
                }
            }
        }

        info!(
            batches = report.batches,
            accepted = report.accepted,
            rejected = report.rejected,
            "Initial load finished"
        );
        Ok(report)
    }

    /// Log stats and the hit count of a `match_all` search.
    pub async fn inspect(&self, stream: &Stream) -> Result<u64, IndexerError> {
        let stats = self.streams.stats(&stream.name).await?;
        info!(
            documents = stats.document_count,
            store_size_bytes = stats.store_size_bytes,
            indices = stats.index_count,
            "Data stream stats"
        );

        let hits = self
            .streams
            .search(&stream.name, &json!({ "query": { "match_all": {} } }))
            .await?;
        info!(total = hits.total, returned = hits.documents.len(), "match_all search");
        Ok(hits.total)
    }

    /// Write one record per interval until `cancel` fires or `source` runs dry.
    pub async fn ingest(
        &self,
        stream: &Stream,
        source: &mut dyn RecordSource,
        cancel: &CancellationToken,
    ) -> LoopSummary {
        self.continuous.run(stream, source, cancel).await
    }

    /// Delete the stream, then its template.
    pub async fn teardown(&self) -> Result<Stream, IndexerError> {
        let stream = self.streams.teardown(&self.settings.stream_name).await?;
        info!(stream = %stream.name, "Data stream torn down");
        Ok(stream)
    }

    /// Full run with generated records: backfill over the current month,
    /// then live records until cancelled.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<LoopSummary, IndexerError> {
        let stream = self.provision().await?;

        let backfill: Vec<LogRecord> = MockLogSource::new(
            MockLogConfig::default()
                .with_timestamps(TimestampMode::ThisMonth)
                .with_limit(self.settings.initial_load_size),
        )
        .collect();
        self.backfill(&stream, &backfill).await?;
        self.inspect(&stream).await?;

        let mut live = MockLogSource::new(MockLogConfig::default().with_timestamps(TimestampMode::Now));
        let summary = self.ingest(&stream, &mut live, cancel).await;

        if self.settings.teardown_on_exit {
            self.teardown().await?;
        }
        Ok(summary)
    }
}
