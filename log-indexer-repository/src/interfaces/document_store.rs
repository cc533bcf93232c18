//! Document store trait definition.
//!
//! This module defines the abstract interface for the remote store holding
//! lifecycle policies, index templates, data streams and their documents.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;
use crate::lifecycle::Policy;
use crate::template::IndexTemplate;
use crate::types::{BulkRequest, ItemStatus, StreamInfo};
use log_indexer_shared::{LogRecord, SearchResponse, StreamStats};

/// Abstract interface for document store operations.
///
/// Implementations are shared between components as `Arc<dyn DocumentStore>`
/// and must be safe for concurrent use by independent callers. Timeouts and
/// transport failures are the implementation's responsibility and surface as
/// [`StoreError::ConnectionError`] or [`StoreError::Timeout`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a lifecycle policy under its id, replacing nothing.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the policy was stored
    /// * `Err(StoreError::AlreadyExists)` - If a policy with the same id exists
    async fn put_policy(&self, policy: &Policy) -> Result<(), StoreError>;

    /// Fetch a lifecycle policy.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Policy))` - The stored policy, with store-added keys dropped
    /// * `Ok(None)` - If no policy has this id
    async fn get_policy(&self, id: &str) -> Result<Option<Policy>, StoreError>;

    /// Create or replace an index template.
    async fn put_template(&self, template: &IndexTemplate) -> Result<(), StoreError>;

    /// Fetch an index template.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(IndexTemplate))` - The stored template
    /// * `Ok(None)` - If no template has this name
    async fn get_template(&self, name: &str) -> Result<Option<IndexTemplate>, StoreError>;

    /// Delete an index template.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the template was deleted
    /// * `Err(StoreError::NotFound)` - If the template does not exist
    async fn delete_template(&self, name: &str) -> Result<(), StoreError>;

    /// Create a data stream from the template whose pattern matches `name`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the stream was created
    /// * `Err(StoreError::AlreadyExists)` - If the stream already exists
    /// * `Err(StoreError::NotFound)` - If no data-stream template matches
    async fn create_stream(&self, name: &str) -> Result<(), StoreError>;

    /// Describe a data stream, or `None` if it does not exist.
    async fn get_stream(&self, name: &str) -> Result<Option<StreamInfo>, StoreError>;

    /// Describe every data stream.
    async fn list_streams(&self) -> Result<Vec<StreamInfo>, StoreError>;

    /// Delete a data stream and all of its backing indices.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the stream was deleted
    /// * `Err(StoreError::NotFound)` - If the stream does not exist
    async fn delete_stream(&self, name: &str) -> Result<(), StoreError>;

    /// Submit a batch of writes as one request.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ItemStatus>)` - One status per request item, in request order
    /// * `Err(StoreError)` - If the request as a whole failed
    async fn bulk(&self, request: &BulkRequest<'_>) -> Result<Vec<ItemStatus>, StoreError>;

    /// Append a single record to a stream.
    async fn write(&self, stream: &str, record: &LogRecord) -> Result<(), StoreError>;

    /// Document count, size and backing index count of a stream.
    ///
    /// Pending writes are made visible before counting.
    async fn stats(&self, stream: &str) -> Result<StreamStats, StoreError>;

    /// Run an opaque query against a stream.
    async fn search(&self, stream: &str, query: &Value) -> Result<SearchResponse, StoreError>;

    /// Check if the store is reachable and able to serve requests.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the store is healthy
    /// * `Ok(false)` - If the store answered but reported itself unhealthy
    /// * `Err(StoreError)` - If the health check could not be executed
    async fn health_check(&self) -> Result<bool, StoreError>;
}
