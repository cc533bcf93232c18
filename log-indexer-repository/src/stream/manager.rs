//! Stream manager.
//!
//! Composes the policy engine and the template manager into the
//! provisioning sequence policy → template → stream, and the reverse
//! teardown stream → template. Steps are not rolled back on failure: the
//! error carries the step that failed and every step is idempotent, so the
//! whole sequence can simply be run again.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::errors::{EntityKind, LifecycleError, Step, StoreError};
use crate::interfaces::DocumentStore;
use crate::lifecycle::{Policy, PolicyEngine};
use crate::stream::{Stream, StreamManagerConfig, StreamStatus};
use crate::template::{build_template, IndexTemplate, TemplateManager};
use log_indexer_shared::{Mapping, SearchResponse, StreamStats};

pub struct StreamManager {
    store: Arc<dyn DocumentStore>,
    policies: PolicyEngine,
    templates: TemplateManager,
    config: StreamManagerConfig,
}

impl StreamManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_config(store, StreamManagerConfig::default())
    }

    pub fn with_config(store: Arc<dyn DocumentStore>, config: StreamManagerConfig) -> Self {
        Self {
            policies: PolicyEngine::new(store.clone()),
            templates: TemplateManager::new(store.clone()),
            store,
            config,
        }
    }

    pub fn policies(&self) -> &PolicyEngine {
        &self.policies
    }

    pub fn templates(&self) -> &TemplateManager {
        &self.templates
    }

    pub fn config(&self) -> &StreamManagerConfig {
        &self.config
    }

    /// The template `provision` registers for a stream.
    pub fn template_for(&self, name: &str, policy: &Policy, mapping: Mapping) -> IndexTemplate {
        build_template(name, self.config.pattern_for(name), &policy.id, mapping)
            .with_shards(self.config.number_of_shards)
            .with_replicas(self.config.number_of_replicas)
            .with_timestamp_field(self.config.timestamp_field.clone())
    }

    /// Register the policy, register the template and create the stream.
    ///
    /// Calling this again with the same arguments succeeds and yields the
    /// same stream. A failure is wrapped in [`LifecycleError::StepFailed`]
    /// naming the step and entity; earlier steps stay in effect.
    #[instrument(skip(self, policy, mapping), fields(stream = %name, policy_id = %policy.id))]
    pub async fn provision(
        &self,
        name: &str,
        policy: &Policy,
        mapping: Mapping,
    ) -> Result<Stream, LifecycleError> {
        self.policies
            .register(policy)
            .await
            .map_err(|e| e.at_step(Step::RegisterPolicy, &policy.id))?;

        let template = self.template_for(name, policy, mapping);
        self.templates
            .register(&template)
            .await
            .map_err(|e| e.at_step(Step::RegisterTemplate, name))?;

        match self.store.create_stream(name).await {
            Ok(()) => info!("Created data stream"),
            Err(StoreError::AlreadyExists(_)) => info!("Data stream already exists"),
            Err(e) => {
                return Err(LifecycleError::from_store(e, EntityKind::Stream, name)
                    .at_step(Step::CreateStream, name))
            }
        }

        let stream = self
            .describe(name)
            .await
            .map_err(|e| e.at_step(Step::VerifyStream, name))?;

        if stream.template.name != template.name {
            return Err(LifecycleError::conflict(EntityKind::Stream, name)
                .at_step(Step::CreateStream, name));
        }

        if self.config.verify_stats {
            let stats = self
                .stats(name)
                .await
                .map_err(|e| e.at_step(Step::VerifyStream, name))?;
            info!(
                documents = stats.document_count,
                indices = stats.index_count,
                "Verified data stream"
            );
        }

        Ok(stream)
    }

    /// Current state of a stream and its backing template.
    pub async fn describe(&self, name: &str) -> Result<Stream, LifecycleError> {
        let mut stream = self.lookup(name).await?;
        let stats = self.stats(name).await?;
        if stats.document_count > 0 {
            stream.status = StreamStatus::Active;
        }
        Ok(stream)
    }

    async fn lookup(&self, name: &str) -> Result<Stream, LifecycleError> {
        let info = self
            .store
            .get_stream(name)
            .await
            .map_err(|e| LifecycleError::from_store(e, EntityKind::Stream, name))?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Stream, name))?;

        let template = self.templates.fetch(&info.template).await?;

        Ok(Stream {
            name: info.name,
            template,
            status: StreamStatus::Created,
            generation: info.generation,
            backing_indices: info.indices,
        })
    }

    /// Create another stream backed by an already registered template.
    #[instrument(skip(self))]
    pub async fn create_stream(&self, name: &str) -> Result<Stream, LifecycleError> {
        self.store.create_stream(name).await.map_err(|e| match e {
            StoreError::NotFound(_) => LifecycleError::not_found(EntityKind::Template, name),
            other => LifecycleError::from_store(other, EntityKind::Stream, name),
        })?;
        info!("Created data stream");
        self.describe(name).await
    }

    /// Delete a single stream, leaving its template in place.
    #[instrument(skip(self))]
    pub async fn delete_stream(&self, name: &str) -> Result<(), LifecycleError> {
        self.store
            .delete_stream(name)
            .await
            .map_err(|e| LifecycleError::from_store(e, EntityKind::Stream, name))?;
        info!("Deleted data stream");
        Ok(())
    }

    /// Delete the stream, then its template.
    ///
    /// Fails with [`LifecycleError::HasDependentStream`] before deleting
    /// anything while other streams still use the template. When the stream
    /// is already gone but its template is not, as after a failed
    /// [`Step::DeleteTemplate`], only the template is deleted.
    #[instrument(skip(self))]
    pub async fn teardown(&self, name: &str) -> Result<Stream, LifecycleError> {
        let mut stream = match self.lookup(name).await {
            Ok(stream) => stream,
            Err(LifecycleError::NotFound {
                entity: EntityKind::Stream,
                ..
            }) => return self.finish_teardown(name).await,
            Err(e) => return Err(e),
        };
        let template = stream.template.name.clone();

        let others: Vec<String> = self
            .templates
            .dependents(&template)
            .await?
            .into_iter()
            .filter(|dependent| dependent != name)
            .collect();
        if !others.is_empty() {
            warn!(template = %template, dependents = ?others, "Template still backs other streams");
            return Err(LifecycleError::HasDependentStream {
                template,
                streams: others,
            });
        }

        self.delete_stream(name)
            .await
            .map_err(|e| e.at_step(Step::DeleteStream, name))?;
        self.templates
            .delete(&template)
            .await
            .map_err(|e| e.at_step(Step::DeleteTemplate, &template))?;

        stream.status = StreamStatus::Deleted;
        Ok(stream)
    }

    async fn finish_teardown(&self, name: &str) -> Result<Stream, LifecycleError> {
        let template = match self.templates.fetch(name).await {
            Ok(template) => template,
            Err(LifecycleError::NotFound { .. }) => {
                return Err(LifecycleError::not_found(EntityKind::Stream, name))
            }
            Err(e) => return Err(e),
        };

        info!(template = %template.name, "Stream already deleted, removing leftover template");
        self.templates
            .delete(&template.name)
            .await
            .map_err(|e| e.at_step(Step::DeleteTemplate, &template.name))?;

        Ok(Stream {
            name: name.to_string(),
            template,
            status: StreamStatus::Deleted,
            generation: 0,
            backing_indices: Vec::new(),
        })
    }

    /// Document count, size and backing index count of a stream.
    pub async fn stats(&self, name: &str) -> Result<StreamStats, LifecycleError> {
        self.store
            .stats(name)
            .await
            .map_err(|e| LifecycleError::from_store(e, EntityKind::Stream, name))
    }

    /// Run an opaque query against a stream.
    pub async fn search(&self, name: &str, query: &Value) -> Result<SearchResponse, LifecycleError> {
        self.store
            .search(name, query)
            .await
            .map_err(|e| LifecycleError::from_store(e, EntityKind::Stream, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::stream::PatternMode;
    use chrono::Utc;
    use log_indexer_shared::{FieldType, LogRecord, TimeValue};

    fn policy(name: &str) -> Policy {
        Policy::rollover_then_delete(name, TimeValue::days(1), None, TimeValue::days(30)).unwrap()
    }

    fn mapping() -> Mapping {
        Mapping::strict()
            .with_field("name", FieldType::Text)
            .with_field("ip_address", FieldType::Keyword)
    }

    #[tokio::test]
    async fn test_provision_creates_everything() {
        let store = Arc::new(InMemoryStore::new());
        let manager = StreamManager::new(store.clone());

        let stream = manager
            .provision("logs_hss", &policy("logs_hss"), mapping())
            .await
            .unwrap();

        assert_eq!(stream.name, "logs_hss");
        assert_eq!(stream.status, StreamStatus::Created);
        assert_eq!(stream.template.policy_id(), "logs_hss");
        assert_eq!(stream.template.mapping, mapping());
        assert_eq!(stream.backing_indices.len(), 1);
        assert!(store.policy("logs_hss").is_some());
        assert!(store.template("logs_hss").is_some());
    }

    #[tokio::test]
    async fn test_provision_twice_is_identical() {
        let store = Arc::new(InMemoryStore::new());
        let manager = StreamManager::new(store);

        let first = manager
            .provision("logs_hss", &policy("logs_hss"), mapping())
            .await
            .unwrap();
        let second = manager
            .provision("logs_hss", &policy("logs_hss"), mapping())
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_provision_failure_names_step() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_next("create_stream", StoreError::timeout("create timed out"));
        let manager = StreamManager::new(store.clone());

        let err = manager
            .provision("logs_hss", &policy("logs_hss"), mapping())
            .await
            .unwrap_err();

        assert_eq!(err.failed_step(), Some(Step::CreateStream));
        assert!(err.is_unavailable());
        // Earlier steps stay in effect; a retry completes the sequence.
        assert!(store.template("logs_hss").is_some());
        manager
            .provision("logs_hss", &policy("logs_hss"), mapping())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_provision_conflicting_policy() {
        let store = Arc::new(InMemoryStore::new());
        let manager = StreamManager::new(store);
        manager
            .provision("logs_hss", &policy("logs_hss"), mapping())
            .await
            .unwrap();

        let other = Policy::rollover_then_delete(
            "logs_hss",
            TimeValue::days(1),
            None,
            TimeValue::days(7),
        )
        .unwrap();
        let err = manager
            .provision("logs_hss", &other, mapping())
            .await
            .unwrap_err();

        assert_eq!(err.failed_step(), Some(Step::RegisterPolicy));
        assert!(matches!(err.root_cause(), LifecycleError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_describe_reports_active_after_writes() {
        let store = Arc::new(InMemoryStore::new());
        let manager = StreamManager::new(store.clone());
        manager
            .provision("logs_hss", &policy("logs_hss"), mapping())
            .await
            .unwrap();

        let record = LogRecord::new().with_field("name", "a").with_timestamp(Utc::now());
        store.write("logs_hss", &record).await.unwrap();

        let stream = manager.describe("logs_hss").await.unwrap();
        assert_eq!(stream.status, StreamStatus::Active);
    }

    #[tokio::test]
    async fn test_teardown_deletes_stream_then_template() {
        let store = Arc::new(InMemoryStore::new());
        let manager = StreamManager::new(store.clone());
        manager
            .provision("logs_hss", &policy("logs_hss"), mapping())
            .await
            .unwrap();

        let stream = manager.teardown("logs_hss").await.unwrap();

        assert_eq!(stream.status, StreamStatus::Deleted);
        assert!(store.stream("logs_hss").is_none());
        assert!(store.template("logs_hss").is_none());
        assert_eq!(
            store.deletions(),
            vec!["stream:logs_hss".to_string(), "template:logs_hss".to_string()]
        );
    }

    #[tokio::test]
    async fn test_teardown_missing_stream() {
        let manager = StreamManager::new(Arc::new(InMemoryStore::new()));

        let err = manager.teardown("logs_hss").await.unwrap_err();
        assert_eq!(err, LifecycleError::not_found(EntityKind::Stream, "logs_hss"));
    }

    #[tokio::test]
    async fn test_teardown_retry_after_template_failure() {
        let store = Arc::new(InMemoryStore::new());
        let manager = StreamManager::new(store.clone());
        manager
            .provision("logs_hss", &policy("logs_hss"), mapping())
            .await
            .unwrap();
        store.fail_next("delete_template", StoreError::timeout("delete timed out"));

        let err = manager.teardown("logs_hss").await.unwrap_err();
        assert_eq!(err.failed_step(), Some(Step::DeleteTemplate));
        assert!(store.stream("logs_hss").is_none());
        assert!(store.template("logs_hss").is_some());

        let stream = manager.teardown("logs_hss").await.unwrap();
        assert_eq!(stream.status, StreamStatus::Deleted);
        assert_eq!(stream.template.name, "logs_hss");
        assert!(store.template("logs_hss").is_none());
        assert_eq!(
            store.deletions(),
            vec!["stream:logs_hss".to_string(), "template:logs_hss".to_string()]
        );

        let err = manager.teardown("logs_hss").await.unwrap_err();
        assert_eq!(err, LifecycleError::not_found(EntityKind::Stream, "logs_hss"));
    }

    #[tokio::test]
    async fn test_teardown_with_dependent_streams() {
        let store = Arc::new(InMemoryStore::new());
        let config = StreamManagerConfig::default().with_pattern(PatternMode::Prefix);
        let manager = StreamManager::with_config(store.clone(), config);
        manager
            .provision("logs", &policy("logs"), mapping())
            .await
            .unwrap();
        manager.create_stream("logs-eu").await.unwrap();

        let err = manager.teardown("logs").await.unwrap_err();
        assert_eq!(
            err,
            LifecycleError::HasDependentStream {
                template: "logs".to_string(),
                streams: vec!["logs-eu".to_string()],
            }
        );
        assert!(store.stream("logs").is_some(), "nothing deleted on refusal");

        manager.delete_stream("logs-eu").await.unwrap();
        manager.teardown("logs").await.unwrap();
        assert!(store.template("logs").is_none());
    }

    #[tokio::test]
    async fn test_create_stream_without_template() {
        let manager = StreamManager::new(Arc::new(InMemoryStore::new()));

        let err = manager.create_stream("orphan").await.unwrap_err();
        assert_eq!(err, LifecycleError::not_found(EntityKind::Template, "orphan"));
    }
}
