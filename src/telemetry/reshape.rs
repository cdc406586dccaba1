//! # Telemetry Reshaper
//!
//! Turns flat dot-delimited sections into a two-level `group -> field`
//! mapping for display.
//!
//! ## Key Arity
//!
//! | Section | Arity | Key | Group | Field |
//! |---------|-------|-----|-------|-------|
//! | `boolean_percentages` | 2 | `Motor.Running` | `Motor` | `Running` |
//! | `fault_counts` | 2 | `Motor.Jam.Count` | `Motor` | `Jam.Count` |
//! | `float_averages` | 3 | `Floats.Hopper.Temperature` | `Hopper` | `Temperature` |
//!
//! Keys that do not split into the expected shape are dropped and reported
//! in [`ReshapeReport::dropped`].

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::snapshot::{Scalar, Section, TelemetrySnapshot};

/// Key delimiter
pub const KEY_DELIMITER: char = '.';

/// How a section's keys are split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// `prefix.rest`, split on the first delimiter
    Two,
    /// `root.group.field`, exactly three components, root discarded
    Three,
}

impl Arity {
    /// Split a key into `(group, field)` or `None` if it does not conform
    fn split<'a>(self, key: &'a str) -> Option<(&'a str, &'a str)> {
        match self {
            Arity::Two => key.split_once(KEY_DELIMITER),
            Arity::Three => {
                let mut parts = key.split(KEY_DELIMITER);
                match (parts.next(), parts.next(), parts.next(), parts.next()) {
                    (Some(_root), Some(group), Some(field), None) => Some((group, field)),
                    _ => None,
                }
            }
        }
    }
}

/// Display-ready grouping of one section
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GroupedTelemetry(IndexMap<String, IndexMap<String, Scalar>>);

impl GroupedTelemetry {
    /// Groups in first-seen order
    pub fn groups(&self) -> &IndexMap<String, IndexMap<String, Scalar>> {
        &self.0
    }

    /// Look up a single field
    pub fn get(&self, group: &str, field: &str) -> Option<&Scalar> {
        self.0.get(group).and_then(|fields| fields.get(field))
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no groups
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of fields across all groups
    pub fn field_count(&self) -> usize {
        self.0.values().map(IndexMap::len).sum()
    }

    /// Flatten back to `group.field` keys
    ///
    /// With `root` set, keys become `root.group.field`, the shape an
    /// arity-3 section was read from.
    pub fn flatten(&self, root: Option<&str>) -> Section {
        let mut flat = Section::with_capacity(self.field_count());
        for (group, fields) in &self.0 {
            for (field, value) in fields {
                let key = match root {
                    Some(root) => format!("{root}{KEY_DELIMITER}{group}{KEY_DELIMITER}{field}"),
                    None => format!("{group}{KEY_DELIMITER}{field}"),
                };
                flat.insert(key, value.clone());
            }
        }
        flat
    }

    fn insert(&mut self, group: &str, field: &str, value: Scalar) {
        self.0
            .entry(group.to_string())
            .or_default()
            .insert(field.to_string(), value);
    }
}

/// Result of reshaping a section, including the keys that were dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReshapeReport {
    pub grouped: GroupedTelemetry,
    pub dropped: Vec<String>,
}

/// Reshape a flat section, reporting non-conforming keys
pub fn reshape_section_report(section: &Section, arity: Arity) -> ReshapeReport {
    let mut report = ReshapeReport::default();

    for (key, value) in section {
        match arity.split(key) {
            Some((group, field)) => report.grouped.insert(group, field, value.clone()),
            None => report.dropped.push(key.clone()),
        }
    }

    report
}

/// Reshape a flat section into groups
///
/// Non-conforming keys are dropped with a warning.
///
/// # Examples
///
/// ```
/// use feeder_link::telemetry::reshape::{reshape_section, Arity};
/// use feeder_link::telemetry::snapshot::{Scalar, Section};
///
/// let mut section = Section::new();
/// section.insert("Floats.Hopper.Temperature".to_string(), Scalar::Float(72.5));
///
/// let grouped = reshape_section(&section, Arity::Three);
/// assert_eq!(grouped.get("Hopper", "Temperature"), Some(&Scalar::Float(72.5)));
/// ```
pub fn reshape_section(section: &Section, arity: Arity) -> GroupedTelemetry {
    let report = reshape_section_report(section, arity);
    if !report.dropped.is_empty() {
        warn!(
            "Dropped {} key(s) not matching {:?} arity: {}",
            report.dropped.len(),
            arity,
            report.dropped.join(", ")
        );
    }
    report.grouped
}

/// Display model of a whole live scan
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupedSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boolean_percentages: Option<GroupedTelemetry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault_counts: Option<GroupedTelemetry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub float_averages: Option<GroupedTelemetry>,

    /// Top-level payload keys passed through unchanged
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,

    /// Keys dropped while decoding or reshaping
    #[serde(skip)]
    pub dropped_keys: usize,
}

/// Reshape every section of a snapshot
pub fn reshape_snapshot(snapshot: &TelemetrySnapshot) -> GroupedSnapshot {
    let mut dropped = snapshot.rejected.len();

    let mut reshape = |section: &Option<Section>, arity: Arity, name: &str| {
        section.as_ref().map(|section| {
            let report = reshape_section_report(section, arity);
            if !report.dropped.is_empty() {
                warn!("{}: dropped malformed keys {:?}", name, report.dropped);
            }
            dropped += report.dropped.len();
            debug!(
                "{}: {} key(s) into {} group(s)",
                name,
                section.len(),
                report.grouped.len()
            );
            report.grouped
        })
    };

    let boolean_percentages = reshape(&snapshot.boolean_percentages, Arity::Two, "boolean_percentages");
    let fault_counts = reshape(&snapshot.fault_counts, Arity::Two, "fault_counts");
    let float_averages = reshape(&snapshot.float_averages, Arity::Three, "float_averages");

    GroupedSnapshot {
        boolean_percentages,
        fault_counts,
        float_averages,
        extra: snapshot.extra.clone(),
        dropped_keys: dropped,
    }
}
