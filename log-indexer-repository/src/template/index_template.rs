//! Index template definition.

use log_indexer_shared::{Mapping, DEFAULT_TIMESTAMP_FIELD};

/// Default template priority. Higher priorities win when patterns overlap.
pub const DEFAULT_TEMPLATE_PRIORITY: u32 = 100;

/// Index-level settings applied to every backing index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSettings {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
    /// Lifecycle policy bound to the backing indices.
    pub policy_id: String,
}

/// Mapping and settings template for a data stream.
///
/// The template's name equals the stream name; its index patterns decide
/// which streams are created from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTemplate {
    pub name: String,
    pub index_patterns: Vec<String>,
    pub timestamp_field: String,
    pub settings: TemplateSettings,
    pub mapping: Mapping,
    pub priority: u32,
}

impl IndexTemplate {
    pub fn with_shards(mut self, shards: u32) -> Self {
        self.settings.number_of_shards = shards;
        self
    }

    pub fn with_replicas(mut self, replicas: u32) -> Self {
        self.settings.number_of_replicas = replicas;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Use `field` as the event time. It leaves the declared properties,
    /// since the timestamp is implicit in every mapping.
    pub fn with_timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = field.into();
        self.mapping.properties.remove(&self.timestamp_field);
        self
    }

    pub fn policy_id(&self) -> &str {
        &self.settings.policy_id
    }

    /// Whether a stream named `stream` would be created from this template.
    pub fn matches(&self, stream: &str) -> bool {
        self.index_patterns
            .iter()
            .any(|pattern| pattern_matches(pattern, stream))
    }
}

/// Build a template with one shard, no replicas and the default timestamp
/// field.
pub fn build_template(
    name: impl Into<String>,
    pattern: impl Into<String>,
    policy_id: impl Into<String>,
    mut mapping: Mapping,
) -> IndexTemplate {
    mapping.properties.remove(DEFAULT_TIMESTAMP_FIELD);
    IndexTemplate {
        name: name.into(),
        index_patterns: vec![pattern.into()],
        timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_string(),
        settings: TemplateSettings {
            number_of_shards: 1,
            number_of_replicas: 0,
            policy_id: policy_id.into(),
        },
        mapping,
        priority: DEFAULT_TEMPLATE_PRIORITY,
    }
}

/// Match `name` against an index pattern where `*` stands for any run of
/// characters.
pub fn pattern_matches(pattern: &str, name: &str) -> bool {
    let pattern = pattern.as_bytes();
    let name = name.as_bytes();
    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, n));
            p += 1;
        } else if p < pattern.len() && pattern[p] == name[n] {
            p += 1;
            n += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            n = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}
