//! In-memory document store.
//!
//! Behaves like a single-node store for the operations the lifecycle and
//! ingestion components use: streams are created from the highest-priority
//! matching template, writes to an unknown stream create it when a
//! template matches, documents are checked against the template mapping,
//! and templates still backing a stream cannot be deleted. Failures can be
//! injected per operation, or for every operation at once.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::errors::StoreError;
use crate::interfaces::DocumentStore;
use crate::lifecycle::Policy;
use crate::template::IndexTemplate;
use crate::types::{BulkRequest, ItemStatus, StreamInfo};
use log_indexer_shared::{LogRecord, SearchResponse, StreamStats};

/// Hits returned by a search without an explicit `size`.
const DEFAULT_SEARCH_SIZE: usize = 10;

struct MemoryStream {
    info: StreamInfo,
    documents: Vec<LogRecord>,
}

#[derive(Default)]
struct Inner {
    policies: BTreeMap<String, Policy>,
    templates: BTreeMap<String, IndexTemplate>,
    streams: BTreeMap<String, MemoryStream>,
    unavailable: bool,
    failures: HashMap<String, VecDeque<StoreError>>,
    requests: usize,
    deletions: Vec<String>,
}

impl Inner {
    fn matching_template(&self, stream: &str) -> Option<&IndexTemplate> {
        self.templates
            .values()
            .filter(|template| template.matches(stream))
            .max_by_key(|template| template.priority)
    }

    fn create_stream(&mut self, name: &str) -> Result<&mut MemoryStream, StoreError> {
        if self.streams.contains_key(name) {
            return Err(StoreError::already_exists(name));
        }
        let template = self.matching_template(name).ok_or_else(|| {
            StoreError::not_found(format!("no matching index template found for data stream [{}]", name))
        })?;

        let info = StreamInfo {
            name: name.to_string(),
            template: template.name.clone(),
            timestamp_field: template.timestamp_field.clone(),
            generation: 1,
            indices: vec![backing_index(name, 1)],
        };
        debug!(stream = %name, template = %info.template, "Created in-memory data stream");

        Ok(self
            .streams
            .entry(name.to_string())
            .or_insert(MemoryStream {
                info,
                documents: Vec::new(),
            }))
    }

    fn append(&mut self, stream: &str, record: &LogRecord) -> Result<(), StoreError> {
        if !self.streams.contains_key(stream) {
            self.create_stream(stream)
                .map_err(|_| StoreError::request_failed(404, format!("index_not_found_exception: no such index [{}]", stream)))?;
        }

        let target = self
            .streams
            .get(stream)
            .ok_or_else(|| StoreError::not_found(stream))?;
        let template = self
            .templates
            .get(&target.info.template)
            .ok_or_else(|| StoreError::not_found(&target.info.template))?;

        template
            .mapping
            .check(record, &template.timestamp_field)
            .map_err(|violation| {
                StoreError::request_failed(400, format!("mapper_parsing_exception: {}", violation))
            })?;

        if let Some(target) = self.streams.get_mut(stream) {
            target.documents.push(record.clone());
        }
        Ok(())
    }
}

fn backing_index(stream: &str, generation: u64) -> String {
    format!(".ds-{}-{:06}", stream, generation)
}

/// A [`DocumentStore`] kept entirely in process memory.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Counts the request and applies injected failures.
    fn begin(&self, operation: &str) -> Result<MutexGuard<'_, Inner>, StoreError> {
        let mut inner = self.lock();
        inner.requests += 1;
        if inner.unavailable {
            return Err(StoreError::connection("connection refused"));
        }
        if let Some(error) = inner
            .failures
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        Ok(inner)
    }

    /// Make every subsequent request fail with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Fail the next call of `operation` (a [`DocumentStore`] method name)
    /// with `error`. Calls queue up.
    pub fn fail_next(&self, operation: &str, error: StoreError) {
        self.lock()
            .failures
            .entry(operation.to_string())
            .or_default()
            .push_back(error);
    }

    /// Number of requests received, including failed ones.
    pub fn request_count(&self) -> usize {
        self.lock().requests
    }

    pub fn policy_count(&self) -> usize {
        self.lock().policies.len()
    }

    pub fn policy(&self, id: &str) -> Option<Policy> {
        self.lock().policies.get(id).cloned()
    }

    pub fn template(&self, name: &str) -> Option<IndexTemplate> {
        self.lock().templates.get(name).cloned()
    }

    pub fn stream(&self, name: &str) -> Option<StreamInfo> {
        self.lock().streams.get(name).map(|s| s.info.clone())
    }

    /// Documents stored in a stream, in write order.
    pub fn documents(&self, stream: &str) -> Vec<LogRecord> {
        self.lock()
            .streams
            .get(stream)
            .map(|s| s.documents.clone())
            .unwrap_or_default()
    }

    /// Deleted entities in deletion order, as `stream:<name>` or
    /// `template:<name>`.
    pub fn deletions(&self) -> Vec<String> {
        self.lock().deletions.clone()
    }

    /// Roll a stream over to a new backing index, as the lifecycle manager
    /// would once a rollover condition is met.
    pub fn rollover(&self, stream: &str) -> Result<String, StoreError> {
        let mut inner = self.lock();
        let target = inner
            .streams
            .get_mut(stream)
            .ok_or_else(|| StoreError::not_found(stream))?;
        target.info.generation += 1;
        let index = backing_index(stream, target.info.generation);
        target.info.indices.push(index.clone());
        Ok(index)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn put_policy(&self, policy: &Policy) -> Result<(), StoreError> {
        let mut inner = self.begin("put_policy")?;
        if inner.policies.contains_key(&policy.id) {
            return Err(StoreError::already_exists(&policy.id));
        }
        inner.policies.insert(policy.id.clone(), policy.clone());
        Ok(())
    }

    async fn get_policy(&self, id: &str) -> Result<Option<Policy>, StoreError> {
        let inner = self.begin("get_policy")?;
        Ok(inner.policies.get(id).cloned())
    }

    async fn put_template(&self, template: &IndexTemplate) -> Result<(), StoreError> {
        let mut inner = self.begin("put_template")?;
        inner
            .templates
            .insert(template.name.clone(), template.clone());
        Ok(())
    }

    async fn get_template(&self, name: &str) -> Result<Option<IndexTemplate>, StoreError> {
        let inner = self.begin("get_template")?;
        Ok(inner.templates.get(name).cloned())
    }

    async fn delete_template(&self, name: &str) -> Result<(), StoreError> {
        let mut inner = self.begin("delete_template")?;
        if !inner.templates.contains_key(name) {
            return Err(StoreError::not_found(name));
        }
        if let Some(stream) = inner.streams.values().find(|s| s.info.template == name) {
            return Err(StoreError::request_failed(
                400,
                format!(
                    "illegal_argument_exception: index template [{}] is used by data stream [{}]",
                    name, stream.info.name
                ),
            ));
        }
        inner.templates.remove(name);
        inner.deletions.push(format!("template:{}", name));
        Ok(())
    }

    async fn create_stream(&self, name: &str) -> Result<(), StoreError> {
        let mut inner = self.begin("create_stream")?;
        inner.create_stream(name).map(|_| ())
    }

    async fn get_stream(&self, name: &str) -> Result<Option<StreamInfo>, StoreError> {
        let inner = self.begin("get_stream")?;
        Ok(inner.streams.get(name).map(|s| s.info.clone()))
    }

    async fn list_streams(&self) -> Result<Vec<StreamInfo>, StoreError> {
        let inner = self.begin("list_streams")?;
        Ok(inner.streams.values().map(|s| s.info.clone()).collect())
    }

    async fn delete_stream(&self, name: &str) -> Result<(), StoreError> {
        let mut inner = self.begin("delete_stream")?;
        if inner.streams.remove(name).is_none() {
            return Err(StoreError::not_found(name));
        }
        inner.deletions.push(format!("stream:{}", name));
        Ok(())
    }

    async fn bulk(&self, request: &BulkRequest<'_>) -> Result<Vec<ItemStatus>, StoreError> {
        let mut inner = self.begin("bulk")?;
        let statuses = request
            .items()
            .iter()
            .map(|item| match inner.append(item.target, item.record) {
                Ok(()) => ItemStatus::created(),
                Err(StoreError::RequestFailed { status, body }) => ItemStatus::failed(status, body),
                Err(other) => ItemStatus::failed(500, other.to_string()),
            })
            .collect();
        Ok(statuses)
    }

    async fn write(&self, stream: &str, record: &LogRecord) -> Result<(), StoreError> {
        let mut inner = self.begin("write")?;
        inner.append(stream, record)
    }

    async fn stats(&self, stream: &str) -> Result<StreamStats, StoreError> {
        let inner = self.begin("stats")?;
        let target = inner
            .streams
            .get(stream)
            .ok_or_else(|| StoreError::not_found(stream))?;

        let store_size_bytes = target
            .documents
            .iter()
            .map(|doc| serde_json::to_vec(doc).map_or(0, |bytes| bytes.len() as u64))
            .sum();

        Ok(StreamStats {
            document_count: target.documents.len() as u64,
            store_size_bytes,
            index_count: target.info.indices.len() as u64,
        })
    }

    async fn search(&self, stream: &str, query: &Value) -> Result<SearchResponse, StoreError> {
        let inner = self.begin("search")?;
        let target = inner
            .streams
            .get(stream)
            .ok_or_else(|| StoreError::not_found(stream))?;

        let size = query
            .get("size")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_SEARCH_SIZE, |size| size as usize);
        let filter = field_filter(query);

        let matches: Vec<&LogRecord> = target
            .documents
            .iter()
            .filter(|doc| match &filter {
                Some((field, value)) => doc.get(field) == Some(value),
                None => true,
            })
            .collect();

        Ok(SearchResponse {
            total: matches.len() as u64,
            documents: matches
                .into_iter()
                .take(size)
                .filter_map(|doc| serde_json::to_value(doc).ok())
                .collect(),
        })
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        self.begin("health_check")?;
        Ok(true)
    }
}

// `{"query": {"term" | "match": {field: value | {"value" | "query": value}}}}`.
// Anything else matches every document.
fn field_filter(query: &Value) -> Option<(String, Value)> {
    let clause = query.get("query")?;
    let fields = clause
        .get("term")
        .or_else(|| clause.get("match"))?
        .as_object()?;
    let (field, value) = fields.iter().next()?;
    let value = match value {
        Value::Object(inner) => inner.get("value").or_else(|| inner.get("query"))?.clone(),
        other => other.clone(),
    };
    Some((field.clone(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::build_template;
    use crate::types::BulkRequest;
    use chrono::Utc;
    use log_indexer_shared::{FieldType, Mapping, TimeValue};
    use serde_json::json;

    async fn store_with_template(pattern: &str) -> InMemoryStore {
        let store = InMemoryStore::new();
        let policy =
            Policy::rollover_then_delete("logs", TimeValue::days(1), None, TimeValue::days(30)).unwrap();
        store.put_policy(&policy).await.unwrap();
        let mapping = Mapping::strict().with_field("name", FieldType::Text);
        store
            .put_template(&build_template("logs", pattern, "logs", mapping))
            .await
            .unwrap();
        store
    }

    fn record(name: &str) -> LogRecord {
        LogRecord::new().with_field("name", name).with_timestamp(Utc::now())
    }

    #[tokio::test]
    async fn test_create_stream_requires_matching_template() {
        let store = store_with_template("logs*").await;

        store.create_stream("logs-eu").await.unwrap();
        assert!(matches!(
            store.create_stream("logs-eu").await,
            Err(StoreError::AlreadyExists(_))
        ));
        assert!(matches!(
            store.create_stream("metrics").await,
            Err(StoreError::NotFound(_))
        ));

        let info = store.get_stream("logs-eu").await.unwrap().unwrap();
        assert_eq!(info.template, "logs");
        assert_eq!(info.indices, vec![".ds-logs-eu-000001".to_string()]);
    }

    #[tokio::test]
    async fn test_bulk_reports_per_item_status() {
        let store = store_with_template("logs").await;
        let good = record("a");
        let bad = record("b").with_field("extra", 1);
        let missing_stream = record("c");

        let mut request = BulkRequest::new();
        request.push("logs", &good);
        request.push("logs", &bad);
        request.push("metrics", &missing_stream);
        let statuses = store.bulk(&request).await.unwrap();

        assert!(statuses[0].is_success());
        assert_eq!(statuses[1].status, 400);
        assert_eq!(statuses[2].status, 404);
        assert_eq!(store.documents("logs").len(), 1);
    }

    #[tokio::test]
    async fn test_stats_and_rollover() {
        let store = store_with_template("logs").await;
        store.write("logs", &record("a")).await.unwrap();
        store.rollover("logs").unwrap();
        store.write("logs", &record("b")).await.unwrap();

        let stats = store.stats("logs").await.unwrap();
        assert_eq!(stats.document_count, 2);
        assert_eq!(stats.index_count, 2);
        assert!(stats.store_size_bytes > 0);
        assert_eq!(
            store.stream("logs").unwrap().indices.last().map(String::as_str),
            Some(".ds-logs-000002")
        );
    }

    #[tokio::test]
    async fn test_search_filters_and_limits() {
        let store = store_with_template("logs").await;
        for name in ["a", "b", "a"] {
            store.write("logs", &record(name)).await.unwrap();
        }

        let all = store
            .search("logs", &json!({ "query": { "match_all": {} }, "size": 2 }))
            .await
            .unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.documents.len(), 2);

        let only_a = store
            .search("logs", &json!({ "query": { "term": { "name": "a" } } }))
            .await
            .unwrap();
        assert_eq!(only_a.total, 2);
    }

    #[tokio::test]
    async fn test_delete_template_in_use_is_refused() {
        let store = store_with_template("logs").await;
        store.create_stream("logs").await.unwrap();

        assert!(matches!(
            store.delete_template("logs").await,
            Err(StoreError::RequestFailed { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryStore::new();
        store.fail_next("health_check", StoreError::timeout("slow"));

        assert!(matches!(store.health_check().await, Err(StoreError::Timeout(_))));
        assert!(store.health_check().await.unwrap());

        store.set_unavailable(true);
        assert!(matches!(
            store.health_check().await,
            Err(StoreError::ConnectionError(_))
        ));
        assert_eq!(store.request_count(), 3);
    }
}
