use log_indexer_shared::DEFAULT_TIMESTAMP_FIELD;

/// How a stream's template pattern is derived from the stream name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternMode {
    /// The pattern is the stream name itself.
    #[default]
    Exact,
    /// The pattern is `name*`, so further streams can share the template.
    Prefix,
}

/// Configuration for the stream manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamManagerConfig {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
    pub pattern: PatternMode,
    pub timestamp_field: String,
    /// Read stream stats after provisioning to confirm the stream answers.
    pub verify_stats: bool,
}

impl Default for StreamManagerConfig {
    fn default() -> Self {
        Self {
            number_of_shards: 1,
            number_of_replicas: 0,
            pattern: PatternMode::Exact,
            timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_string(),
            verify_stats: true,
        }
    }
}

impl StreamManagerConfig {
    pub fn with_pattern(mut self, pattern: PatternMode) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn with_replicas(mut self, replicas: u32) -> Self {
        self.number_of_replicas = replicas;
        self
    }

    pub fn with_shards(mut self, shards: u32) -> Self {
        self.number_of_shards = shards;
        self
    }

    pub fn pattern_for(&self, name: &str) -> String {
        match self.pattern {
            PatternMode::Exact => name.to_string(),
            PatternMode::Prefix => format!("{}*", name),
        }
    }
}
