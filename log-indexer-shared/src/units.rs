//! Time and size values in the store's compact string form (`30d`, `10gb`).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to parse a unit string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} value '{input}'")]
pub struct UnitParseError {
    kind: &'static str,
    input: String,
}

impl UnitParseError {
    fn new(kind: &'static str, input: &str) -> Self {
        Self {
            kind,
            input: input.to_string(),
        }
    }
}

fn split_number(input: &str) -> Option<(u64, &str)> {
    let trimmed = input.trim();
    let digits = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    if digits == 0 {
        return None;
    }
    let amount = trimmed[..digits].parse().ok()?;
    Some((amount, trimmed[digits..].trim()))
}

/// Unit of a [`TimeValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Millis => "ms",
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
            Self::Days => "d",
        }
    }

    fn millis(&self) -> u64 {
        match self {
            Self::Millis => 1,
            Self::Seconds => 1_000,
            Self::Minutes => 60_000,
            Self::Hours => 3_600_000,
            Self::Days => 86_400_000,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ms" => Ok(Self::Millis),
            "s" => Ok(Self::Seconds),
            "m" => Ok(Self::Minutes),
            "h" => Ok(Self::Hours),
            "d" => Ok(Self::Days),
            _ => Err(UnitParseError::new("time unit", s)),
        }
    }
}

/// An age threshold such as `1d` or `30d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeValue {
    pub amount: u64,
    pub unit: TimeUnit,
}

impl TimeValue {
    pub fn new(amount: u64, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }

    pub fn days(amount: u64) -> Self {
        Self::new(amount, TimeUnit::Days)
    }

    pub fn hours(amount: u64) -> Self {
        Self::new(amount, TimeUnit::Hours)
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.amount.saturating_mul(self.unit.millis()))
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl FromStr for TimeValue {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (amount, unit) = split_number(s).ok_or_else(|| UnitParseError::new("time", s))?;
        let unit = unit.parse().map_err(|_| UnitParseError::new("time", s))?;
        Ok(Self { amount, unit })
    }
}

impl TryFrom<String> for TimeValue {
    type Error = UnitParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeValue> for String {
    fn from(value: TimeValue) -> Self {
        value.to_string()
    }
}

/// Unit of a [`ByteSize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteUnit {
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
    Terabytes,
}

impl ByteUnit {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Bytes => "b",
            Self::Kilobytes => "kb",
            Self::Megabytes => "mb",
            Self::Gigabytes => "gb",
            Self::Terabytes => "tb",
        }
    }

    fn multiplier(&self) -> u64 {
        match self {
            Self::Bytes => 1,
            Self::Kilobytes => 1 << 10,
            Self::Megabytes => 1 << 20,
            Self::Gigabytes => 1 << 30,
            Self::Terabytes => 1 << 40,
        }
    }
}

/// A size threshold such as `10gb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ByteSize {
    pub amount: u64,
    pub unit: ByteUnit,
}

impl ByteSize {
    pub fn new(amount: u64, unit: ByteUnit) -> Self {
        Self { amount, unit }
    }

    pub fn gb(amount: u64) -> Self {
        Self::new(amount, ByteUnit::Gigabytes)
    }

    pub fn as_bytes(&self) -> u64 {
        self.amount.saturating_mul(self.unit.multiplier())
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl FromStr for ByteSize {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (amount, unit) = split_number(s).ok_or_else(|| UnitParseError::new("size", s))?;
        let unit = match unit.to_ascii_lowercase().as_str() {
            "b" => ByteUnit::Bytes,
            "kb" => ByteUnit::Kilobytes,
            "mb" => ByteUnit::Megabytes,
            "gb" => ByteUnit::Gigabytes,
            "tb" => ByteUnit::Terabytes,
            _ => return Err(UnitParseError::new("size", s)),
        };
        Ok(Self { amount, unit })
    }
}

impl TryFrom<String> for ByteSize {
    type Error = UnitParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ByteSize> for String {
    fn from(value: ByteSize) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_value() {
        let value: TimeValue = "30d".parse().unwrap();
        assert_eq!(value, TimeValue::days(30));
        assert_eq!(value.as_duration(), Duration::from_secs(30 * 86_400));
        assert_eq!(value.to_string(), "30d");

        assert_eq!("250ms".parse::<TimeValue>().unwrap().as_duration(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_time_value_rejects_garbage() {
        assert!("d".parse::<TimeValue>().is_err());
        assert!("30w".parse::<TimeValue>().is_err());
        assert!("".parse::<TimeValue>().is_err());
    }

    #[test]
    fn test_parse_byte_size() {
        let size: ByteSize = "10gb".parse().unwrap();
        assert_eq!(size, ByteSize::gb(10));
        assert_eq!(size.as_bytes(), 10 * 1024 * 1024 * 1024);
        assert_eq!("512MB".parse::<ByteSize>().unwrap().to_string(), "512mb");
    }

    #[test]
    fn test_serde_uses_string_form() {
        let json = serde_json::to_string(&TimeValue::hours(12)).unwrap();
        assert_eq!(json, "\"12h\"");

        let size: ByteSize = serde_json::from_str("\"5kb\"").unwrap();
        assert_eq!(size.as_bytes(), 5 * 1024);
    }
}
