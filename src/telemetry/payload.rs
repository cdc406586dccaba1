//! # Tag Payload
//!
//! Classifies decoded tag text into one of the known payload variants.

use serde_json::Value;

use super::series::CompactFloatSeries;
use super::snapshot::TelemetrySnapshot;
use crate::error::{FeederLinkError, Result};

/// Keys that mark a compact float series payload
const SERIES_KEYS: [&str; 3] = ["start", "interval", "values"];

/// A decoded tag payload
#[derive(Debug, Clone, PartialEq)]
pub enum TagPayload {
    /// Live telemetry sections
    Telemetry(TelemetrySnapshot),
    /// Compact float time series
    FloatSeries(CompactFloatSeries),
    /// Valid JSON of no known shape
    Unrecognized(Value),
}

impl TagPayload {
    /// Parse tag text as JSON and classify it
    ///
    /// # Errors
    ///
    /// - `CorruptPayload` if the text is not valid JSON
    /// - `InvalidFormat` if the JSON looks like a float series but fails validation
    pub fn parse(text: &str) -> Result<Self> {
        Self::classify(parse_json(text)?)
    }

    /// Classify an already decoded JSON value
    pub fn classify(value: Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Ok(TagPayload::Unrecognized(value));
        };

        if SERIES_KEYS.iter().any(|key| object.contains_key(*key)) {
            return CompactFloatSeries::from_value(&value).map(TagPayload::FloatSeries);
        }
        if TelemetrySnapshot::has_known_section(object) {
            return Ok(TagPayload::Telemetry(TelemetrySnapshot::from_object(object)));
        }

        Ok(TagPayload::Unrecognized(value))
    }

    /// Short variant name for logs
    pub fn variant_name(&self) -> &'static str {
        match self {
            TagPayload::Telemetry(_) => "telemetry",
            TagPayload::FloatSeries(_) => "float series",
            TagPayload::Unrecognized(_) => "unrecognized",
        }
    }
}

/// Parse tag text as JSON, mapping failures to `CorruptPayload`
pub fn parse_json(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| FeederLinkError::CorruptPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_parse_telemetry() {
        let payload =
            TagPayload::parse(r#"{"float_averages": {"Floats.HopperVibratory.Temperature": 72.5}}"#)
                .unwrap();
        match payload {
            TagPayload::Telemetry(snapshot) => {
                assert_eq!(snapshot.float_averages.unwrap().len(), 1);
            }
            other => panic!("Expected telemetry, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_float_series() {
        let payload =
            TagPayload::parse(r#"{"start":"2024-01-01T00:00:00Z","interval":60,"values":[1,2,3]}"#)
                .unwrap();
        match payload {
            TagPayload::FloatSeries(series) => {
                assert_eq!(series.values, vec![1.0, 2.0, 3.0]);
                assert_eq!(series.interval_secs, 60.0);
            }
            other => panic!("Expected float series, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_corrupt() {
        let err = TagPayload::parse(r#"{"float_averages": {"Floats.A"#).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::CorruptPayload));
        assert_eq!(TagPayload::parse("").unwrap_err().kind(), Some(ErrorKind::CorruptPayload));
    }

    #[test]
    fn test_partial_series_is_invalid_format() {
        let err = TagPayload::parse(r#"{"start":"2024-01-01T00:00:00Z","values":[1]}"#).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidFormat));
    }

    #[test]
    fn test_unrecognized() {
        assert!(matches!(
            TagPayload::classify(json!({"hello": "world"})).unwrap(),
            TagPayload::Unrecognized(_)
        ));
        assert!(matches!(
            TagPayload::classify(json!([1, 2])).unwrap(),
            TagPayload::Unrecognized(_)
        ));
        assert_eq!(
            TagPayload::classify(json!(42)).unwrap().variant_name(),
            "unrecognized"
        );
    }
}
