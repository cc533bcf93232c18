//! Dependency initialization and wiring for the log indexer.

use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::run::Indexer;
use crate::IndexerError;
use log_indexer_repository::{DocumentStore, OpenSearchStore};

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub settings: Settings,
    /// Shared handle to the document store.
    pub store: Arc<dyn DocumentStore>,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`Settings::from_env`] for the variables read.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexerError)` - If configuration is malformed or the cluster is unreachable
    pub async fn new() -> Result<Self, IndexerError> {
        let settings = Settings::from_env()?;
        Self::connect(settings).await
    }

    /// Connect to the cluster described by `settings` and verify it is healthy.
    pub async fn connect(settings: Settings) -> Result<Self, IndexerError> {
        info!(
            opensearch_url = %settings.opensearch.url,
            stream = %settings.stream_name,
            verify_certs = settings.opensearch.verify_certs,
            "Initializing dependencies"
        );

        let store = OpenSearchStore::new(&settings.opensearch)
            .map_err(|e| IndexerError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        // Verify OpenSearch is reachable
        let healthy = store
            .health_check()
            .await
            .map_err(|e| IndexerError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(IndexerError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        Ok(Self {
            settings,
            store: Arc::new(store),
        })
    }

    /// Build the indexer over the connected store.
    pub fn indexer(&self) -> Indexer {
        Indexer::new(self.store.clone(), self.settings.clone())
    }
}
