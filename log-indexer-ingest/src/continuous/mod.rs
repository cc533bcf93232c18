//! Continuous ingestion loop.
//!
//! One record per tick: take it from the source, check it against the
//! stream's mapping, write it, then wait out the pacing interval. The wait
//! is the only point where the loop yields to cancellation, so a write is
//! never interrupted halfway. Failed writes are logged and counted; only
//! cancellation, an exhausted source or the tick limit end the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use log_indexer_repository::{DocumentStore, Stream};
use log_indexer_shared::RecordSource;

/// Default pause between two writes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(300);

/// Configuration for the continuous ingestion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuousConfig {
    /// Pause after each tick.
    pub interval: Duration,
    /// Stop after this many ticks. `None` runs until cancelled.
    pub max_ticks: Option<u64>,
}

impl Default for ContinuousConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_ticks: None,
        }
    }
}

impl ContinuousConfig {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    /// Records taken from the source.
    pub ticks: u64,
    /// Records the store accepted.
    pub written: u64,
    /// Writes the store failed or refused.
    pub failed: u64,
    /// Records that did not fit the mapping and were never sent.
    pub rejected: u64,
}

/// Paces single-record writes into a stream.
pub struct ContinuousIngestor {
    store: Arc<dyn DocumentStore>,
    config: ContinuousConfig,
}

impl ContinuousIngestor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_config(store, ContinuousConfig::default())
    }

    pub fn with_config(store: Arc<dyn DocumentStore>, config: ContinuousConfig) -> Self {
        Self { store, config }
    }

    /// Run until `cancel` fires, the source runs dry or the tick limit is hit.
    #[instrument(skip_all, fields(stream = %stream.name, interval_ms = self.config.interval.as_millis() as u64))]
    pub async fn run(
        &self,
        stream: &Stream,
        source: &mut dyn RecordSource,
        cancel: &CancellationToken,
    ) -> LoopSummary {
        let mapping = &stream.template.mapping;
        let timestamp_field = stream.timestamp_field();
        let mut summary = LoopSummary::default();

        info!("Starting continuous ingestion");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            if self.config.max_ticks.is_some_and(|max| summary.ticks >= max) {
                debug!("Tick limit reached");
                break;
            }
            let Some(record) = source.next_record() else {
                info!("Record source exhausted");
                break;
            };
            summary.ticks += 1;

            match mapping.check(&record, timestamp_field) {
                Err(violation) => {
                    summary.rejected += 1;
                    warn!(tick = summary.ticks, reason = %violation, "Record rejected");
                }
                Ok(()) => match self.store.write(&stream.name, &record).await {
                    Ok(()) => {
                        summary.written += 1;
                        debug!(tick = summary.ticks, "Record written");
                    }
                    Err(e) => {
                        summary.failed += 1;
                        warn!(tick = summary.ticks, error = %e, "Write failed");
                    }
                },
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.config.interval) => {}
            }
        }

        info!(
            ticks = summary.ticks,
            written = summary.written,
            failed = summary.failed,
            rejected = summary.rejected,
            "Continuous ingestion stopped"
        );
        summary
    }
}
