//! # Telemetry Snapshot
//!
//! Typed view of a live telemetry payload as written by the feeder.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// Section holding boolean status percentages (`Prefix.Name` keys)
pub const SECTION_BOOLEAN_PERCENTAGES: &str = "boolean_percentages";

/// Section holding fault counters (`Prefix.Name` keys)
pub const SECTION_FAULT_COUNTS: &str = "fault_counts";

/// Section holding float sensor averages (`Root.Group.Field` keys)
pub const SECTION_FLOAT_AVERAGES: &str = "float_averages";

/// All well-known top-level sections
pub const KNOWN_SECTIONS: [&str; 3] = [
    SECTION_BOOLEAN_PERCENTAGES,
    SECTION_FAULT_COUNTS,
    SECTION_FLOAT_AVERAGES,
];

/// A single telemetry value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Convert a JSON value, rejecting arrays, objects and null
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Scalar::Integer(i)),
                None => n.as_f64().map(Scalar::Float),
            },
            Value::String(s) => Some(Scalar::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

/// Flat section: dot-delimited key to value, in payload order
pub type Section = IndexMap<String, Scalar>;

/// Raw decoded live telemetry
///
/// Absent sections stay `None`. Top-level keys other than the known
/// sections are carried through in `extra`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub boolean_percentages: Option<Section>,
    pub fault_counts: Option<Section>,
    pub float_averages: Option<Section>,
    pub extra: IndexMap<String, Value>,
    /// Keys whose values were not scalars, as `section.key`
    pub rejected: Vec<String>,
}

impl TelemetrySnapshot {
    /// Build a snapshot from a decoded JSON object
    ///
    /// Never fails: non-scalar values are dropped per key and a known
    /// section that is not an object is treated as absent.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let mut snapshot = TelemetrySnapshot::default();

        for (key, value) in object {
            let slot = match key.as_str() {
                SECTION_BOOLEAN_PERCENTAGES => &mut snapshot.boolean_percentages,
                SECTION_FAULT_COUNTS => &mut snapshot.fault_counts,
                SECTION_FLOAT_AVERAGES => &mut snapshot.float_averages,
                _ => {
                    snapshot.extra.insert(key.clone(), value.clone());
                    continue;
                }
            };

            let Some(entries) = value.as_object() else {
                warn!("Section {} is not an object, ignoring it", key);
                snapshot.rejected.push(key.clone());
                continue;
            };

            let mut section = Section::with_capacity(entries.len());
            for (field, raw) in entries {
                match Scalar::from_json(raw) {
                    Some(scalar) => {
                        section.insert(field.clone(), scalar);
                    }
                    None => {
                        warn!("Dropping non-scalar value at {}.{}", key, field);
                        snapshot.rejected.push(format!("{}.{}", key, field));
                    }
                }
            }
            *slot = Some(section);
        }

        snapshot
    }

    /// Whether the object carries at least one known section
    pub fn has_known_section(object: &Map<String, Value>) -> bool {
        KNOWN_SECTIONS.iter().any(|name| object.contains_key(*name))
    }
}
