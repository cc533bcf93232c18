use std::fmt;

use crate::template::IndexTemplate;

/// Lifecycle status of a stream as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Exists and holds no documents yet.
    Created,
    /// Exists and has received documents.
    Active,
    /// Removed by teardown.
    Deleted,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// A logical data stream and the template backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub name: String,
    pub template: IndexTemplate,
    pub status: StreamStatus,
    pub generation: u64,
    pub backing_indices: Vec<String>,
}

impl Stream {
    /// The field every record written to this stream must carry.
    pub fn timestamp_field(&self) -> &str {
        &self.template.timestamp_field
    }
}
