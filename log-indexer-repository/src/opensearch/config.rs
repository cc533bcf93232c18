//! Connection settings for the OpenSearch store.

use std::time::Duration;

/// Connection settings for [`OpenSearchStore`](super::OpenSearchStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSearchConfig {
    /// Base URL, e.g. `https://localhost:9200`.
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Verify the server certificate. Off for self-signed development clusters.
    pub verify_certs: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self {
            url: "https://localhost:9200".to_string(),
            username: Some("admin".to_string()),
            password: Some("admin".to_string()),
            verify_certs: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl OpenSearchConfig {
    /// Settings for `url` without credentials.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            ..Default::default()
        }
    }

    /// Build the URL from its parts.
    pub fn from_parts(scheme: &str, host: &str, port: u16) -> Self {
        Self::new(format!("{}://{}:{}", scheme, host, port))
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_verify_certs(mut self, verify: bool) -> Self {
        self.verify_certs = verify;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts() {
        let config = OpenSearchConfig::from_parts("http", "search.local", 9201)
            .with_credentials("ingest", "secret")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.url, "http://search.local:9201");
        assert_eq!(config.username.as_deref(), Some("ingest"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.verify_certs);
    }
}
