//! Run settings read from the environment.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use log_indexer_repository::OpenSearchConfig;
use log_indexer_shared::{ByteSize, TimeUnit, TimeValue};

use crate::IndexerError;

const DEFAULT_OPENSEARCH_HOST: &str = "localhost";
const DEFAULT_OPENSEARCH_PORT: u16 = 9200;
const DEFAULT_OPENSEARCH_SCHEME: &str = "https";
const DEFAULT_OPENSEARCH_USER: &str = "admin";
const DEFAULT_OPENSEARCH_PASSWORD: &str = "admin";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default data stream name. Also used as the policy id.
const DEFAULT_DATA_STREAM_NAME: &str = "logs_hss";

const DEFAULT_RETENTION_VALUE: u64 = 30;
const DEFAULT_ROLLOVER_VALUE: u64 = 1;
const DEFAULT_ROLLOVER_MIN_SIZE_GB: u64 = 10;
const DEFAULT_INITIAL_LOAD_SIZE: usize = 1000;
const DEFAULT_INGEST_INTERVAL_MS: u64 = 300;

/// Everything the binary needs to know before it connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub opensearch: OpenSearchConfig,
    pub stream_name: String,
    /// Age at which the write index rolls over.
    pub rollover_age: TimeValue,
    /// Size at which the write index rolls over.
    pub rollover_min_size: ByteSize,
    /// Age at which a backing index is deleted.
    pub retention: TimeValue,
    /// Records written by the initial bulk load.
    pub initial_load_size: usize,
    /// Pause between live writes.
    pub ingest_interval: Duration,
    /// Remove the stream and its template when the run ends.
    pub teardown_on_exit: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            opensearch: OpenSearchConfig::from_parts(
                DEFAULT_OPENSEARCH_SCHEME,
                DEFAULT_OPENSEARCH_HOST,
                DEFAULT_OPENSEARCH_PORT,
            )
            .with_credentials(DEFAULT_OPENSEARCH_USER, DEFAULT_OPENSEARCH_PASSWORD)
            .with_verify_certs(false)
            .with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            stream_name: DEFAULT_DATA_STREAM_NAME.to_string(),
            rollover_age: TimeValue::days(DEFAULT_ROLLOVER_VALUE),
            rollover_min_size: ByteSize::gb(DEFAULT_ROLLOVER_MIN_SIZE_GB),
            retention: TimeValue::days(DEFAULT_RETENTION_VALUE),
            initial_load_size: DEFAULT_INITIAL_LOAD_SIZE,
            ingest_interval: Duration::from_millis(DEFAULT_INGEST_INTERVAL_MS),
            teardown_on_exit: false,
        }
    }
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_HOST`, `OPENSEARCH_PORT`, `OPENSEARCH_SCHEME`: cluster address (default: https://localhost:9200)
    /// - `OPENSEARCH_USER`, `OPENSEARCH_PASSWORD`: basic auth (default: admin / admin)
    /// - `OPENSEARCH_VERIFY_CERTS`: verify the server certificate (default: false)
    /// - `OPENSEARCH_TIMEOUT_SECS`: per-request timeout (default: 30)
    /// - `DATA_STREAM_NAME`: stream and policy name (default: logs_hss)
    /// - `RETENTION_UNIT`: unit for rollover and retention ages (default: d)
    /// - `RETENTION_VALUE`: retention age (default: 30)
    /// - `ROLLOVER_VALUE`: rollover age (default: 1)
    /// - `ROLLOVER_MIN_SIZE`: rollover size (default: 10gb)
    /// - `INITIAL_LOAD_SIZE`: records in the initial bulk load (default: 1000)
    /// - `INGEST_INTERVAL_MS`: pause between live writes (default: 300)
    /// - `TEARDOWN_ON_EXIT`: delete the stream and template on exit (default: false)
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - Parsed settings
    /// * `Err(IndexerError::ConfigError)` - If a variable holds a malformed value
    pub fn from_env() -> Result<Self, IndexerError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for unset names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let scheme = lookup("OPENSEARCH_SCHEME").unwrap_or_else(|| DEFAULT_OPENSEARCH_SCHEME.to_string());
        if scheme != "http" && scheme != "https" {
            return Err(invalid("OPENSEARCH_SCHEME", &scheme));
        }
        let host = lookup("OPENSEARCH_HOST").unwrap_or_else(|| DEFAULT_OPENSEARCH_HOST.to_string());
        let port = parse_var(&lookup, "OPENSEARCH_PORT", DEFAULT_OPENSEARCH_PORT)?;
        let user = lookup("OPENSEARCH_USER").unwrap_or_else(|| DEFAULT_OPENSEARCH_USER.to_string());
        let password =
            lookup("OPENSEARCH_PASSWORD").unwrap_or_else(|| DEFAULT_OPENSEARCH_PASSWORD.to_string());
        let verify_certs = parse_flag(&lookup, "OPENSEARCH_VERIFY_CERTS", false)?;
        let timeout_secs = parse_var(&lookup, "OPENSEARCH_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        let opensearch = OpenSearchConfig::from_parts(&scheme, &host, port)
            .with_credentials(user, password)
            .with_verify_certs(verify_certs)
            .with_timeout(Duration::from_secs(timeout_secs));

        let stream_name =
            lookup("DATA_STREAM_NAME").unwrap_or_else(|| DEFAULT_DATA_STREAM_NAME.to_string());
        if stream_name.trim().is_empty() {
            return Err(invalid("DATA_STREAM_NAME", &stream_name));
        }

        let unit = parse_var(&lookup, "RETENTION_UNIT", TimeUnit::Days)?;
        let retention = parse_var(&lookup, "RETENTION_VALUE", DEFAULT_RETENTION_VALUE)?;
        let rollover = parse_var(&lookup, "ROLLOVER_VALUE", DEFAULT_ROLLOVER_VALUE)?;
        let rollover_min_size = match lookup("ROLLOVER_MIN_SIZE") {
            Some(raw) => raw
                .parse::<ByteSize>()
                .map_err(|_| invalid("ROLLOVER_MIN_SIZE", &raw))?,
            None => ByteSize::gb(DEFAULT_ROLLOVER_MIN_SIZE_GB),
        };

        let initial_load_size = parse_var(&lookup, "INITIAL_LOAD_SIZE", DEFAULT_INITIAL_LOAD_SIZE)?;
        let interval_ms = parse_var(&lookup, "INGEST_INTERVAL_MS", DEFAULT_INGEST_INTERVAL_MS)?;
        let teardown_on_exit = parse_flag(&lookup, "TEARDOWN_ON_EXIT", false)?;

        Ok(Self {
            opensearch,
            stream_name,
            rollover_age: TimeValue::new(rollover, unit),
            rollover_min_size,
            retention: TimeValue::new(retention, unit),
            initial_load_size,
            ingest_interval: Duration::from_millis(interval_ms),
            teardown_on_exit,
        })
    }
}

fn invalid(name: &str, raw: &str) -> IndexerError {
    IndexerError::config(format!("{} has invalid value '{}'", name, raw))
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, IndexerError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| IndexerError::config(format!("{} has invalid value '{}': {}", name, raw, e))),
        None => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, name: &str, default: bool) -> Result<bool, IndexerError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(invalid(name, &raw)),
        },
        None => Ok(default),
    }
}
