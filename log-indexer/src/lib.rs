//! # Log Indexer
//!
//! Entry point for the log indexer binary: environment configuration,
//! dependency wiring and the provision, backfill and live ingestion run.

pub mod config;
pub mod run;

pub use config::{Dependencies, Settings};
pub use run::Indexer;

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Lifecycle or ingestion error.
    #[error("Lifecycle error: {0}")]
    LifecycleError(#[from] log_indexer_repository::LifecycleError),

    /// Store error raised while wiring dependencies.
    #[error("Store error: {0}")]
    StoreError(#[from] log_indexer_repository::StoreError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
