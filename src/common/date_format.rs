// Temporal Literal Conversion
//
// Canonical rules for turning textual date/time literals into epoch
// milliseconds. All conversions are in UTC so that filter values bound at
// runtime compare equal to the literals the planner folded at compile time.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

pub const DEFAULT_DATE_PATTERN: &str = "%Y-%m-%d";
pub const COMPACT_DATE_PATTERN: &str = "%Y%m%d";
pub const DEFAULT_DATETIME_PATTERN_WITHOUT_MILLISECONDS: &str = "%Y-%m-%d %H:%M:%S";
pub const DEFAULT_DATETIME_PATTERN_WITH_MILLISECONDS: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Errors raised while converting temporal literals
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DateFormatError {
    #[error("there is no valid date pattern for: {0}")]
    NoPattern(String),

    #[error("cannot parse '{value}' with pattern '{pattern}': {reason}")]
    Parse {
        value: String,
        pattern: &'static str,
        reason: String,
    },
}

/// Result type for date conversions
pub type Result<T> = std::result::Result<T, DateFormatError>;

/// Convert a date, datetime or epoch-millis literal to epoch milliseconds.
///
/// The pattern is picked from the literal's shape:
/// all digits of length 8 is `yyyyMMdd`, any other all-digit string is
/// already epoch millis, length 10 is a date, length 19 a datetime without
/// fraction, longer a datetime with fractional seconds.
pub fn string_to_millis(s: &str) -> Result<i64> {
    let s = s.trim();
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        if s.len() == 8 {
            if let Ok(millis) = parse_date(s, COMPACT_DATE_PATTERN) {
                return Ok(millis);
            }
        }
        return s.parse::<i64>().map_err(|e| DateFormatError::Parse {
            value: s.to_string(),
            pattern: "epoch millis",
            reason: e.to_string(),
        });
    }

    match s.len() {
        10 => parse_date(s, DEFAULT_DATE_PATTERN),
        19 => parse_datetime(s, DEFAULT_DATETIME_PATTERN_WITHOUT_MILLISECONDS),
        n if n > 19 => parse_datetime(s, DEFAULT_DATETIME_PATTERN_WITH_MILLISECONDS),
        _ => Err(DateFormatError::NoPattern(s.to_string())),
    }
}

/// Format epoch milliseconds with the default datetime pattern (UTC)
pub fn millis_to_string(millis: i64) -> Option<String> {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.naive_utc().format(DEFAULT_DATETIME_PATTERN_WITHOUT_MILLISECONDS).to_string())
}

fn parse_date(s: &str, pattern: &'static str) -> Result<i64> {
    let date = NaiveDate::parse_from_str(s, pattern).map_err(|e| DateFormatError::Parse {
        value: s.to_string(),
        pattern,
        reason: e.to_string(),
    })?;
    // midnight always exists for a valid date
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| DateFormatError::NoPattern(s.to_string()))?;
    Ok(midnight.and_utc().timestamp_millis())
}

fn parse_datetime(s: &str, pattern: &'static str) -> Result<i64> {
    let dt = NaiveDateTime::parse_from_str(s, pattern).map_err(|e| DateFormatError::Parse {
        value: s.to_string(),
        pattern,
        reason: e.to_string(),
    })?;
    Ok(dt.and_utc().timestamp_millis())
}
