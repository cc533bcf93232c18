//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `DocumentStore`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    cert::CertificateValidation,
    cluster::ClusterHealthParts,
    http::{
        headers::HeaderMap,
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
        Method,
    },
    indices::IndicesRefreshParts,
    params::OpType,
    BulkParts, CountParts, IndexParts, OpenSearch, SearchParts,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::errors::StoreError;
use crate::interfaces::DocumentStore;
use crate::lifecycle::Policy;
use crate::opensearch::config::OpenSearchConfig;
use crate::opensearch::documents;
use crate::template::IndexTemplate;
use crate::types::{BulkRequest, ItemStatus, StreamInfo};
use log_indexer_shared::{LogRecord, SearchResponse, StreamStats};

/// OpenSearch-backed document store.
///
/// # Example
///
/// ```ignore
/// let config = OpenSearchConfig::from_parts("https", "localhost", 9200)
///     .with_credentials("admin", "admin");
/// let store = OpenSearchStore::new(&config)?;
/// assert!(store.health_check().await?);
/// ```
pub struct OpenSearchStore {
    client: OpenSearch,
}

impl OpenSearchStore {
    /// Create a new store client from connection settings.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchStore)` - A new client instance
    /// * `Err(StoreError)` - If the URL is invalid or the transport cannot be built
    pub fn new(config: &OpenSearchConfig) -> Result<Self, StoreError> {
        let parsed_url =
            Url::parse(&config.url).map_err(|e| StoreError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(config.timeout);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.auth(Credentials::Basic(username.clone(), password.clone()));
        }
        if !config.verify_certs {
            builder = builder.cert_validation(CertificateValidation::None);
        }
        let transport = builder
            .build()
            .map_err(|e| StoreError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %config.url,
            verify_certs = config.verify_certs,
            "Created OpenSearch client"
        );

        Ok(Self { client })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response, StoreError> {
        debug!(method = ?method, path = %path, "Sending request");
        self.client
            .send(
                method,
                &format!("/{}", path),
                HeaderMap::new(),
                Option::<&()>::None,
                body.map(JsonBody::new),
                None,
            )
            .await
            .map_err(transport_error)
    }
}

fn transport_error(e: opensearch::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::timeout(e.to_string())
    } else {
        StoreError::connection(e.to_string())
    }
}

/// Turn a non-success response into a `StoreError`.
///
/// `missing` is the name reported when the store answers 404.
async fn check(response: Response, missing: &str) -> Result<Response, StoreError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        404 => Err(StoreError::not_found(missing)),
        409 => Err(StoreError::already_exists(missing)),
        _ if error_body.contains("resource_already_exists_exception") => {
            Err(StoreError::already_exists(missing))
        }
        code => {
            error!(status = %status, body = %error_body, "Request failed");
            Err(StoreError::request_failed(code, error_body))
        }
    }
}

async fn json(response: Response) -> Result<Value, StoreError> {
    let text = response
        .text()
        .await
        .map_err(|e| StoreError::connection(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| StoreError::parse(e.to_string()))
}

// A 404 on a lookup is an absent entity, not a failure.
async fn optional_json(response: Response, missing: &str) -> Result<Option<Value>, StoreError> {
    match check(response, missing).await {
        Ok(response) => json(response).await.map(Some),
        Err(StoreError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl DocumentStore for OpenSearchStore {
    #[instrument(skip(self, policy), fields(policy_id = %policy.id))]
    async fn put_policy(&self, policy: &Policy) -> Result<(), StoreError> {
        let body = documents::policy_body(policy)?;
        let response = self
            .send(Method::Put, &documents::policy_path(&policy.id), Some(body))
            .await?;
        check(response, &policy.id).await?;

        debug!("Policy stored");
        Ok(())
    }

    async fn get_policy(&self, id: &str) -> Result<Option<Policy>, StoreError> {
        let response = self
            .send(Method::Get, &documents::policy_path(id), None)
            .await?;
        optional_json(response, id)
            .await?
            .map(|body| documents::parse_policy(id, &body))
            .transpose()
    }

    #[instrument(skip(self, template), fields(template = %template.name))]
    async fn put_template(&self, template: &IndexTemplate) -> Result<(), StoreError> {
        let body = documents::template_body(template);
        let response = self
            .send(Method::Put, &documents::template_path(&template.name), Some(body))
            .await?;
        check(response, &template.name).await?;

        debug!("Index template stored");
        Ok(())
    }

    async fn get_template(&self, name: &str) -> Result<Option<IndexTemplate>, StoreError> {
        let response = self
            .send(Method::Get, &documents::template_path(name), None)
            .await?;
        match optional_json(response, name).await? {
            Some(body) => documents::parse_template(name, &body),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn delete_template(&self, name: &str) -> Result<(), StoreError> {
        let response = self
            .send(Method::Delete, &documents::template_path(name), None)
            .await?;
        check(response, name).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_stream(&self, name: &str) -> Result<(), StoreError> {
        let response = self
            .send(Method::Put, &documents::stream_path(name), None)
            .await?;
        match check(response, name).await {
            Err(StoreError::RequestFailed { body, .. })
                if body.contains("no matching index template") =>
            {
                Err(StoreError::not_found(name))
            }
            other => other.map(|_| ()),
        }
    }

    async fn get_stream(&self, name: &str) -> Result<Option<StreamInfo>, StoreError> {
        let response = self
            .send(Method::Get, &documents::stream_path(name), None)
            .await?;
        let Some(body) = optional_json(response, name).await? else {
            return Ok(None);
        };
        Ok(documents::parse_streams(&body)?
            .into_iter()
            .find(|stream| stream.name == name))
    }

    async fn list_streams(&self) -> Result<Vec<StreamInfo>, StoreError> {
        let response = self.send(Method::Get, "_data_stream", None).await?;
        let body = json(check(response, "_data_stream").await?).await?;
        documents::parse_streams(&body)
    }

    #[instrument(skip(self))]
    async fn delete_stream(&self, name: &str) -> Result<(), StoreError> {
        let response = self
            .send(Method::Delete, &documents::stream_path(name), None)
            .await?;
        check(response, name).await?;
        Ok(())
    }

    #[instrument(skip(self, request), fields(count = request.len()))]
    async fn bulk(&self, request: &BulkRequest<'_>) -> Result<Vec<ItemStatus>, StoreError> {
        let body: Vec<JsonBody<Value>> = documents::bulk_lines(request)?
            .into_iter()
            .map(JsonBody::from)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;
        let response_body = json(check(response, "_bulk").await?).await?;

        let items = documents::parse_bulk_items(&response_body, request.len())?;
        debug!(
            failed = items.iter().filter(|item| !item.is_success()).count(),
            "Bulk request completed"
        );
        Ok(items)
    }

    async fn write(&self, stream: &str, record: &LogRecord) -> Result<(), StoreError> {
        let response = self
            .client
            .index(IndexParts::Index(stream))
            .op_type(OpType::Create)
            .body(record)
            .send()
            .await
            .map_err(transport_error)?;
        check(response, stream).await?;
        Ok(())
    }

    async fn stats(&self, stream: &str) -> Result<StreamStats, StoreError> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[stream]))
            .send()
            .await
            .map_err(transport_error)?;
        check(response, stream).await?;

        let response = self
            .client
            .count(CountParts::Index(&[stream]))
            .send()
            .await
            .map_err(transport_error)?;
        let document_count = documents::parse_count(&json(check(response, stream).await?).await?)?;

        let response = self
            .send(Method::Get, &documents::stream_stats_path(stream), None)
            .await?;
        let body = json(check(response, stream).await?).await?;
        let (store_size_bytes, index_count) = documents::parse_stream_stats(stream, &body)?;

        Ok(StreamStats {
            document_count,
            store_size_bytes,
            index_count,
        })
    }

    async fn search(&self, stream: &str, query: &Value) -> Result<SearchResponse, StoreError> {
        let response = self
            .client
            .search(SearchParts::Index(&[stream]))
            .body(query)
            .send()
            .await
            .map_err(transport_error)?;
        let body = json(check(response, stream).await?).await?;
        Ok(documents::parse_search(&body))
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(transport_error)?;
        let body = json(check(response, "_cluster/health").await?).await?;

        let healthy = documents::is_healthy(&body);
        let status = body
            .get("status")
            .and_then(|status| status.as_str())
            .unwrap_or("unknown");
        info!(
            status = %status,
            healthy,
            "Cluster health"
        );
        Ok(healthy)
    }
}
