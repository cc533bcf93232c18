/// Configuration for bulk ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestConfig {
    /// Maximum number of records per bulk call. `None` means unlimited.
    pub max_batch_size: Option<usize>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_batch_size: Some(1000),
        }
    }
}

impl IngestConfig {
    /// Create a config with no batch size limit.
    pub fn unlimited() -> Self {
        Self {
            max_batch_size: None,
        }
    }

    /// Create a config with a specific batch size limit.
    pub fn with_max_batch_size(max: usize) -> Self {
        Self {
            max_batch_size: Some(max),
        }
    }
}
