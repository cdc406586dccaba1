//! # Float Range Request
//!
//! Outbound command asking the feeder to put one field's history on the tag.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{FeederLinkError, Result};

/// Command name understood by the feeder
pub const FLOAT_RANGE_CMD: &str = "float_range";

/// Range end understood by the feeder
pub const RANGE_STOP_NOW: &str = "now()";

/// Default namespace prefix of float fields
pub const DEFAULT_FIELD_ROOT: &str = "Floats";

/// Start of the requested window
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RangeToken {
    /// `-30m`
    #[default]
    LastThirtyMinutes,
    /// `-3h`
    LastThreeHours,
    /// `-12h`
    LastTwelveHours,
    /// Any other token, passed through verbatim
    Raw(String),
}

impl RangeToken {
    /// Token as written to the tag
    pub fn as_str(&self) -> &str {
        match self {
            RangeToken::LastThirtyMinutes => "-30m",
            RangeToken::LastThreeHours => "-3h",
            RangeToken::LastTwelveHours => "-12h",
            RangeToken::Raw(token) => token,
        }
    }
}

impl FromStr for RangeToken {
    type Err = FeederLinkError;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        match token {
            "" => Err(FeederLinkError::InvalidFormat("range token cannot be empty".to_string())),
            "-30m" => Ok(RangeToken::LastThirtyMinutes),
            "-3h" => Ok(RangeToken::LastThreeHours),
            "-12h" => Ok(RangeToken::LastTwelveHours),
            other => Ok(RangeToken::Raw(other.to_string())),
        }
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire form of the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FloatRangeRequest {
    pub cmd: &'static str,
    pub field: String,
    pub start: String,
    pub stop: &'static str,
}

impl FloatRangeRequest {
    /// Build a request, normalizing `field` to carry the `root.` prefix
    ///
    /// # Examples
    ///
    /// ```
    /// use feeder_link::exchange::request::{FloatRangeRequest, RangeToken};
    ///
    /// let request = FloatRangeRequest::new("HopperVibratory.Temperature", &RangeToken::default(), "Floats");
    /// assert_eq!(request.field, "Floats.HopperVibratory.Temperature");
    /// assert_eq!(request.start, "-30m");
    /// ```
    pub fn new(field: &str, range: &RangeToken, root: &str) -> Self {
        Self {
            cmd: FLOAT_RANGE_CMD,
            field: normalize_field(field, root),
            start: range.as_str().to_string(),
            stop: RANGE_STOP_NOW,
        }
    }

    /// Serialize to the JSON text written on the tag
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Prefix `field` with `root.` unless it already carries it
pub fn normalize_field(field: &str, root: &str) -> String {
    let prefix = format!("{}.", root);
    if field.starts_with(&prefix) {
        field.to_string()
    } else {
        format!("{}{}", prefix, field)
    }
}
