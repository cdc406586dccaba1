//! # Float-Series Expander
//!
//! Expands the compact `{start, interval, values}` tag encoding into an
//! explicit, chronologically ordered sample sequence.
//!
//! Sample `i` is placed at `start + i * interval` seconds. Timestamps are
//! computed in epoch milliseconds; fractional milliseconds are truncated.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{FeederLinkError, Result};

/// Accepted naive datetime layouts, interpreted as UTC; seconds are optional
const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Accepted layouts with a numeric offset (`+0000` or `+00:00`)
const OFFSET_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"];

/// Accepted date-only layout, interpreted as UTC midnight
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validated compact series as carried on the tag
#[derive(Debug, Clone, PartialEq)]
pub struct CompactFloatSeries {
    pub start: DateTime<Utc>,
    pub interval_secs: f64,
    pub values: Vec<f64>,
}

impl CompactFloatSeries {
    /// Validate a decoded JSON value
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if:
    /// - The value is not an object
    /// - `start` is missing or not a parseable datetime string
    /// - `interval` is missing, not a number, or not positive
    /// - `values` is not an array of numbers
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| invalid("float series must be a JSON object"))?;

        let start = object
            .get("start")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("start must be a datetime string"))?;
        let start = parse_start(start)?;

        let interval_secs = object
            .get("interval")
            .and_then(Value::as_f64)
            .ok_or_else(|| invalid("interval must be a number"))?;
        if !interval_secs.is_finite() || interval_secs <= 0.0 {
            return Err(invalid(format!("interval must be positive, got {}", interval_secs)));
        }

        let raw_values = object
            .get("values")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("values must be an array"))?;
        let values = raw_values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_f64()
                    .ok_or_else(|| invalid(format!("values[{}] is not a number", i)))
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(Self {
            start,
            interval_secs,
            values,
        })
    }
}

/// Parse the `start` field the way the feeder writes it
///
/// Accepts RFC 3339, numeric offsets without a colon, naive `T`- or
/// space-separated datetimes with or without seconds (UTC, a trailing `Z`
/// allowed) and plain dates (UTC midnight).
pub fn parse_start(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    let naive_raw = raw.strip_suffix(['Z', 'z']).unwrap_or(raw);
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(naive_raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(invalid(format!("start is not a datetime: {:?}", raw)))
}

/// One expanded sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FloatSample {
    #[serde(serialize_with = "serialize_iso")]
    pub time: DateTime<Utc>,
    pub value: f64,
}

impl FloatSample {
    /// ISO-8601 time with millisecond precision, e.g. `2024-01-01T00:01:00.000Z`
    pub fn iso_time(&self) -> String {
        iso_millis(&self.time)
    }

    /// Epoch milliseconds
    pub fn timestamp_ms(&self) -> i64 {
        self.time.timestamp_millis()
    }
}

/// Chart-ready projection of a sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub time: String,
    pub value: f64,
    /// Epoch milliseconds, used as the x coordinate
    pub timestamp: i64,
}

/// Ordered sample sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FloatSampleSeries {
    samples: Vec<FloatSample>,
}

impl FloatSampleSeries {
    pub fn samples(&self) -> &[FloatSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Project every sample onto chart coordinates
    pub fn chart_points(&self) -> Vec<ChartPoint> {
        self.samples
            .iter()
            .map(|sample| ChartPoint {
                time: sample.iso_time(),
                value: sample.value,
                timestamp: sample.timestamp_ms(),
            })
            .collect()
    }
}

/// Expand a compact series into explicit samples
///
/// # Errors
///
/// Returns `InvalidFormat` if a sample time falls outside the representable
/// datetime range.
///
/// # Examples
///
/// ```
/// use feeder_link::telemetry::series::{expand, CompactFloatSeries};
/// use serde_json::json;
///
/// let compact = CompactFloatSeries::from_value(&json!({
///     "start": "2024-01-01T00:00:00Z",
///     "interval": 60,
///     "values": [1, 2, 3]
/// }))?;
/// let series = expand(&compact)?;
/// assert_eq!(series.samples()[2].iso_time(), "2024-01-01T00:02:00.000Z");
/// # Ok::<(), feeder_link::error::FeederLinkError>(())
/// ```
pub fn expand(compact: &CompactFloatSeries) -> Result<FloatSampleSeries> {
    let start_ms = compact.start.timestamp_millis();
    let interval_ms = compact.interval_secs * 1000.0;

    let samples = compact
        .values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let offset = (i as f64 * interval_ms).trunc();
            let time = start_ms
                .checked_add(offset as i64)
                .filter(|_| offset.is_finite() && offset < i64::MAX as f64)
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .ok_or_else(|| invalid(format!("sample {} is out of datetime range", i)))?;
            Ok(FloatSample { time, value })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FloatSampleSeries { samples })
}

fn iso_millis(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_iso<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&iso_millis(time))
}

fn invalid(message: impl Into<String>) -> FeederLinkError {
    FeederLinkError::InvalidFormat(message.into())
}
