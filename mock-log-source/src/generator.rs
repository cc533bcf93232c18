//! Mock log record generator.
//!
//! Supports both deterministic mode (seeded, for reproducible tests) and
//! random mode (entropy-seeded, for load generation).

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use log_indexer_shared::LogRecord;

/// Fields every generated record carries besides `@timestamp`.
pub const GENERATED_FIELDS: [&str; 5] = ["name", "address", "phone_number", "email", "ip_address"];

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah",
    "Wei", "Yuki", "Aisha", "Mateo", "Priya", "Lars",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Wilson", "Anderson", "Thomas", "Taylor", "Moore", "Chen",
    "Tanaka", "Okafor", "Novak", "Larsen",
];

const STREETS: &[&str] = &[
    "Main", "Oak", "Pine", "Maple", "Cedar", "Elm", "Washington", "Lake", "Hill", "Park", "River",
    "Sunset",
];

const STREET_KINDS: &[&str] = &["St", "Ave", "Rd", "Blvd", "Lane", "Way", "Court"];

const CITIES: &[(&str, &str)] = &[
    ("Springfield", "IL"),
    ("Riverside", "CA"),
    ("Franklin", "TN"),
    ("Greenville", "SC"),
    ("Madison", "WI"),
    ("Salem", "OR"),
    ("Fairview", "TX"),
    ("Clinton", "NY"),
];

const MAIL_DOMAINS: &[&str] = &["example.com", "example.net", "example.org", "mail.test"];

/// How generated records are timestamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampMode {
    /// The moment the record is generated, for live ingestion.
    #[default]
    Now,
    /// A random instant between the start of the current month and now,
    /// for backfilling a stream.
    ThisMonth,
}

/// Configuration for the mock log source.
#[derive(Debug, Clone)]
pub struct MockLogConfig {
    /// Seed for the generator. `None` seeds from system entropy.
    pub seed: Option<u64>,
    pub timestamps: TimestampMode,
    /// Stop after this many records. `None` never stops.
    pub limit: Option<usize>,
    /// Fixed "now" for timestamps. `None` reads the clock per record.
    pub reference_time: Option<DateTime<Utc>>,
}

impl Default for MockLogConfig {
    fn default() -> Self {
        Self {
            seed: None,
            timestamps: TimestampMode::Now,
            limit: None,
            reference_time: None,
        }
    }
}

impl MockLogConfig {
    /// Create a new config for deterministic testing.
    pub fn deterministic() -> Self {
        Self {
            seed: Some(42),
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_timestamps(mut self, timestamps: TimestampMode) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }
}

/// An endless (or limited) stream of synthetic log records.
#[derive(Debug)]
pub struct MockLogSource {
    config: MockLogConfig,
    rng: StdRng,
    produced: usize,
}

impl MockLogSource {
    /// Create a new mock source with the given configuration.
    pub fn new(config: MockLogConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            produced: 0,
        }
    }

    /// Create a mock source with default deterministic configuration.
    pub fn deterministic() -> Self {
        Self::new(MockLogConfig::deterministic())
    }

    /// Number of records produced so far.
    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Generate one record, ignoring the limit.
    pub fn generate(&mut self) -> LogRecord {
        let first = self.pick(FIRST_NAMES);
        let last = self.pick(LAST_NAMES);
        let address = self.address();
        let phone = self.phone_number();
        let email = format!(
            "{}.{}{}@{}",
            first.to_lowercase(),
            last.to_lowercase(),
            self.rng.gen_range(1..100),
            self.pick(MAIL_DOMAINS)
        );
        let ip = format!(
            "{}.{}.{}.{}",
            self.rng.gen_range(1..=223),
            self.rng.gen_range(0..=255),
            self.rng.gen_range(0..=255),
            self.rng.gen_range(1..=254)
        );
        let timestamp = self.timestamp();

        self.produced += 1;
        LogRecord::new()
            .with_field("name", format!("{} {}", first, last))
            .with_field("address", address)
            .with_field("phone_number", phone)
            .with_field("email", email)
            .with_field("ip_address", ip)
            .with_timestamp(timestamp)
    }

    fn pick<'a>(&mut self, options: &[&'a str]) -> &'a str {
        options[self.rng.gen_range(0..options.len())]
    }

    fn address(&mut self) -> String {
        let number = self.rng.gen_range(1..10_000);
        let street = self.pick(STREETS);
        let kind = self.pick(STREET_KINDS);
        let (city, state) = CITIES[self.rng.gen_range(0..CITIES.len())];
        let zip = self.rng.gen_range(10_000..100_000);
        format!("{} {} {}\n{}, {} {}", number, street, kind, city, state, zip)
    }

    fn phone_number(&mut self) -> String {
        format!(
            "({:03}) {:03}-{:04}",
            self.rng.gen_range(200..1000),
            self.rng.gen_range(200..1000),
            self.rng.gen_range(0..10_000)
        )
    }

    fn timestamp(&mut self) -> DateTime<Utc> {
        let now = self.config.reference_time.unwrap_or_else(Utc::now);
        match self.config.timestamps {
            TimestampMode::Now => now,
            TimestampMode::ThisMonth => {
                let month_start = Utc
                    .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
                    .single()
                    .unwrap_or(now);
                let span = (now - month_start).num_milliseconds().max(0);
                month_start + Duration::milliseconds(self.rng.gen_range(0..=span))
            }
        }
    }
}

impl Iterator for MockLogSource {
    type Item = LogRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.config.limit.is_some_and(|limit| self.produced >= limit) {
            return None;
        }
        Some(self.generate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log_indexer_shared::DEFAULT_TIMESTAMP_FIELD;
    use std::net::Ipv4Addr;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_record_fields() {
        let record = MockLogSource::deterministic().next().unwrap();

        for field in GENERATED_FIELDS {
            assert!(record.get(field).is_some(), "missing {}", field);
        }
        assert!(record.contains(DEFAULT_TIMESTAMP_FIELD));
        assert_eq!(record.len(), GENERATED_FIELDS.len() + 1);

        let ip = record.get("ip_address").unwrap().as_str().unwrap();
        assert!(ip.parse::<Ipv4Addr>().is_ok());
        assert!(record.get("email").unwrap().as_str().unwrap().contains('@'));
    }

    #[test]
    fn test_deterministic_sequences_match() {
        let config = MockLogConfig::deterministic().with_reference_time(fixed_now());

        let a: Vec<LogRecord> = MockLogSource::new(config.clone()).take(20).collect();
        let b: Vec<LogRecord> = MockLogSource::new(config).take(20).collect();

        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a: Vec<LogRecord> = MockLogSource::new(MockLogConfig::default().with_seed(1).with_reference_time(fixed_now()))
            .take(5)
            .collect();
        let b: Vec<LogRecord> = MockLogSource::new(MockLogConfig::default().with_seed(2).with_reference_time(fixed_now()))
            .take(5)
            .collect();

        assert_ne!(a, b);
    }

    #[test]
    fn test_limit() {
        let mut source = MockLogSource::new(MockLogConfig::deterministic().with_limit(3));

        assert_eq!(source.by_ref().count(), 3);
        assert_eq!(source.produced(), 3);
        assert!(source.next().is_none());
    }

    #[test]
    fn test_this_month_timestamps() {
        let now = fixed_now();
        let month_start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let source = MockLogSource::new(
            MockLogConfig::deterministic()
                .with_timestamps(TimestampMode::ThisMonth)
                .with_reference_time(now),
        );

        for record in source.take(100) {
            let raw = record.get(DEFAULT_TIMESTAMP_FIELD).unwrap().as_str().unwrap();
            let ts = DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc);
            assert!(ts >= month_start && ts <= now, "{} out of range", raw);
        }
    }

    #[test]
    fn test_now_timestamps_use_reference() {
        let record = MockLogSource::new(MockLogConfig::deterministic().with_reference_time(fixed_now()))
            .next()
            .unwrap();

        assert_eq!(
            record.get(DEFAULT_TIMESTAMP_FIELD).unwrap(),
            "2024-05-17T09:30:00.000Z"
        );
    }
}
