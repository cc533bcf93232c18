//! Read-side shapes returned by the document store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Size and document figures for one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    /// Documents visible to search across all backing indices.
    pub document_count: u64,
    /// Bytes on disk across all backing indices.
    pub store_size_bytes: u64,
    /// Number of backing indices (one more after every rollover).
    pub index_count: u64,
}

/// Result of an opaque search against a stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Total number of matching documents reported by the store.
    pub total: u64,
    /// Sources of the returned hits, in store order.
    pub documents: Vec<Value>,
}

impl SearchResponse {
    pub fn empty() -> Self {
        Self::default()
    }
}
