//! Flat introspection records
//!
//! Every listing operation describes its entities as flat field→scalar
//! records so one filter engine can serve all of them. Records are built
//! fresh per call by a host capability and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A scalar record field value.
///
/// `Absent` is the lookup result for a field a record does not carry. It is
/// a distinguished value: never numeric, ordered below every present value,
/// equal only to itself, and rendered as the empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Absent,
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::UInt(u) => write!(f, "{}", u),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Absent => Ok(()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// A flat field→scalar description of one introspected entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    /// Field lookup; a missing field yields `Absent`.
    pub fn get(&self, name: &str) -> &Value {
        self.0.get(name).unwrap_or(&Value::Absent)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Conversion from a typed collaborator result into a flat record.
pub trait ToRecord {
    fn to_record(&self) -> Record;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Str("libc.so".into()).to_string(), "libc.so");
        assert_eq!(Value::Int(-7).to_string(), "-7");
        assert_eq!(Value::UInt(4096).to_string(), "4096");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(10.0).to_string(), "10");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Absent.to_string(), "");
    }

    #[test]
    fn test_value_untagged_deserialization() {
        assert_eq!(
            serde_json::from_str::<Value>("\"abc\"").unwrap(),
            Value::Str("abc".into())
        );
        assert_eq!(serde_json::from_str::<Value>("12").unwrap(), Value::Int(12));
        assert_eq!(
            serde_json::from_str::<Value>("2.5").unwrap(),
            Value::Float(2.5)
        );
        assert_eq!(
            serde_json::from_str::<Value>("true").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(serde_json::from_str::<Value>("null").unwrap(), Value::Absent);
    }

    #[test]
    fn test_value_absent_serializes_to_null() {
        assert_eq!(serde_json::to_string(&Value::Absent).unwrap(), "null");
    }

    #[test]
    fn test_record_builder_and_lookup() {
        let rec = Record::new().field("name", "libfoo.so").field("size", 4096usize);
        assert_eq!(rec.get("name"), &Value::Str("libfoo.so".into()));
        assert_eq!(rec.get("size"), &Value::UInt(4096));
        assert_eq!(rec.len(), 2);
    }

    #[test]
    fn test_record_missing_field_is_absent() {
        let rec = Record::new().field("name", "x");
        assert!(rec.get("base").is_absent());
    }

    #[test]
    fn test_record_serializes_as_flat_map() {
        let rec = Record::new().field("base", 0x1000usize).field("name", "a");
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["base"], serde_json::json!(4096));
        assert_eq!(json["name"], serde_json::json!("a"));
    }
}
