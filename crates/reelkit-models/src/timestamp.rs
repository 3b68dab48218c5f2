//! Time specifications for trim points and caption windows.
//!
//! Callers may express a point in time either as a plain number of seconds
//! or as a timecode string (`HH:MM:SS`, `HH:MM:SS.mmm`, `MM:SS`, `SS`).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A point in time, given as seconds or as a timecode.
///
/// Deserializes from either a JSON number or a JSON string:
/// ```
/// use reelkit_models::TimeSpec;
/// let a: TimeSpec = serde_json::from_str("12.5").unwrap();
/// let b: TimeSpec = serde_json::from_str("\"00:00:12.500\"").unwrap();
/// assert_eq!(a.to_seconds().unwrap(), b.to_seconds().unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TimeSpec {
    Seconds(f64),
    Timecode(String),
}

impl TimeSpec {
    /// Resolve to seconds.
    ///
    /// Plain seconds are returned as-is (negative values included, callers
    /// clamp against the probed duration). Timecodes must be non-negative.
    pub fn to_seconds(&self) -> Result<f64, TimestampError> {
        match self {
            TimeSpec::Seconds(secs) if secs.is_finite() => Ok(*secs),
            TimeSpec::Seconds(secs) => {
                Err(TimestampError::InvalidValue("seconds", secs.to_string()))
            }
            TimeSpec::Timecode(ts) => parse_timestamp(ts),
        }
    }
}

impl From<f64> for TimeSpec {
    fn from(secs: f64) -> Self {
        TimeSpec::Seconds(secs)
    }
}

impl From<&str> for TimeSpec {
    fn from(ts: &str) -> Self {
        TimeSpec::Timecode(ts.to_string())
    }
}

/// Parse a timecode string to total seconds.
///
/// # Examples
/// ```
/// use reelkit_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("90").unwrap(), 90.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    // Components from least significant: seconds, minutes, hours.
    const NAMES: [&str; 3] = ["seconds", "minutes", "hours"];
    const SCALES: [f64; 3] = [1.0, 60.0, 3600.0];

    let mut total = 0.0;
    for (idx, part) in parts.iter().rev().enumerate() {
        let value: f64 = part
            .trim()
            .parse()
            .map_err(|_| TimestampError::InvalidValue(NAMES[idx], part.to_string()))?;
        if !value.is_finite() {
            return Err(TimestampError::InvalidValue(NAMES[idx], part.to_string()));
        }
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        total += value * SCALES[idx];
    }

    Ok(total)
}

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative")]
    Negative,

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS, HH:MM:SS.mmm, MM:SS, or SS")]
    InvalidFormat(String),
}
