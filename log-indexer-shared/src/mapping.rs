//! Field mappings and record validation.
//!
//! A [`Mapping`] is the client-side copy of the schema an index template
//! declares. Records are checked against it at the ingestion boundary so a
//! malformed record becomes a typed rejection instead of a store error.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::record::LogRecord;

/// Field types understood by the validator.
///
/// Types the validator has no rule for (`geo_point`, `nested`, ...) are kept
/// as [`FieldType::Other`] so a stored mapping can always be read back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Keyword,
    Date,
    Long,
    Integer,
    Short,
    Double,
    Float,
    Boolean,
    Ip,
    Object,
    Other(String),
}

impl FieldType {
    /// The type name as the store spells it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Keyword => "keyword",
            Self::Date => "date",
            Self::Long => "long",
            Self::Integer => "integer",
            Self::Short => "short",
            Self::Double => "double",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Ip => "ip",
            Self::Object => "object",
            Self::Other(name) => name.as_str(),
        }
    }

    /// Map a store type name, keeping unknown names as [`FieldType::Other`].
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| Self::Other(name.to_string()))
    }

    /// Whether `value` can be indexed into a field of this type.
    ///
    /// Follows the store's coercion rules: numeric strings are accepted for
    /// numeric fields, scalars are accepted for string fields, `null` is
    /// always accepted and arrays are checked element by element.
    pub fn accepts(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::Array(items) => items.iter().all(|item| self.accepts(item)),
            _ => self.accepts_scalar(value),
        }
    }

    fn accepts_scalar(&self, value: &Value) -> bool {
        match self {
            Self::Text | Self::Keyword => {
                matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
            }
            Self::Long => integer_in_range(value, i64::MIN, i64::MAX),
            Self::Integer => integer_in_range(value, i32::MIN as i64, i32::MAX as i64),
            Self::Short => integer_in_range(value, i16::MIN as i64, i16::MAX as i64),
            Self::Double | Self::Float => match value {
                Value::Number(_) => true,
                Value::String(s) => s.trim().parse::<f64>().is_ok(),
                _ => false,
            },
            Self::Boolean => match value {
                Value::Bool(_) => true,
                Value::String(s) => s == "true" || s == "false",
                _ => false,
            },
            Self::Date => match value {
                Value::Number(n) => n.is_i64() || n.is_u64(),
                Value::String(s) => is_date(s),
                _ => false,
            },
            Self::Ip => match value {
                Value::String(s) => s.parse::<IpAddr>().is_ok(),
                _ => false,
            },
            Self::Object => value.is_object(),
            // Left to the store.
            Self::Other(_) => true,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "keyword" => Ok(Self::Keyword),
            "date" => Ok(Self::Date),
            "long" => Ok(Self::Long),
            "integer" => Ok(Self::Integer),
            "short" => Ok(Self::Short),
            "double" => Ok(Self::Double),
            "float" => Ok(Self::Float),
            "boolean" => Ok(Self::Boolean),
            "ip" => Ok(Self::Ip),
            "object" => Ok(Self::Object),
            other => Err(format!("unsupported field type '{}'", other)),
        }
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.as_str().to_string()
    }
}

fn integer_in_range(value: &Value, min: i64, max: i64) -> bool {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    matches!(parsed, Some(n) if n >= min && n <= max)
}

fn is_date(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Why a record does not fit a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordViolation {
    #[error("missing timestamp")]
    MissingTimestamp,

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("unknown field '{0}' (dynamic mapping disabled)")]
    UnknownField(String),

    #[error("field '{field}' is not a valid {expected}")]
    TypeMismatch { field: String, expected: FieldType },
}

/// Schema of the documents accepted by a stream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mapping {
    /// When false, fields not listed in `properties` are rejected.
    pub dynamic: bool,
    pub properties: BTreeMap<String, FieldType>,
}

impl Mapping {
    /// A mapping that rejects unknown fields.
    pub fn strict() -> Self {
        Self {
            dynamic: false,
            properties: BTreeMap::new(),
        }
    }

    /// A mapping that lets unknown fields through.
    pub fn dynamic() -> Self {
        Self {
            dynamic: true,
            properties: BTreeMap::new(),
        }
    }

    /// Declare a field.
    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.properties.insert(name.into(), field_type);
        self
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.properties.get(name).cloned()
    }

    /// Check a record against this mapping.
    ///
    /// The timestamp field is mandatory, must hold a date and is implicitly
    /// part of every mapping.
    pub fn check(&self, record: &LogRecord, timestamp_field: &str) -> Result<(), RecordViolation> {
        match record.get(timestamp_field) {
            None | Some(Value::Null) => return Err(RecordViolation::MissingTimestamp),
            Some(value @ Value::Array(_)) => {
                return Err(RecordViolation::InvalidTimestamp(value.to_string()))
            }
            Some(value) if !FieldType::Date.accepts(value) => {
                return Err(RecordViolation::InvalidTimestamp(value.to_string()))
            }
            Some(_) => {}
        }

        for (name, value) in record.fields() {
            if name == timestamp_field {
                continue;
            }
            match self.properties.get(name) {
                Some(field_type) if !field_type.accepts(value) => {
                    return Err(RecordViolation::TypeMismatch {
                        field: name.clone(),
                        expected: field_type.clone(),
                    });
                }
                Some(_) => {}
                None if !self.dynamic => {
                    return Err(RecordViolation::UnknownField(name.clone()));
                }
                None => {}
            }
        }

        Ok(())
    }
}
