//! Timestamp parsing and storage encoding.
//!
//! # Invariants
//! - All timestamps are UTC with microsecond precision.
//! - Offset-less input is interpreted as UTC.

use crate::model::note::NoteValidationError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Current time truncated to storage precision.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Smallest representable difference between two stored timestamps.
pub fn smallest_step() -> Duration {
    Duration::microseconds(1)
}

/// A timestamp that cannot move forward any more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampOverflow(pub DateTime<Utc>);

impl Display for TimestampOverflow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "timestamp {} cannot advance further", self.0)
    }
}

impl Error for TimestampOverflow {}

/// Returns `now`, or `previous` plus one step when `now` is not later.
pub fn advance_past(
    previous: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, TimestampOverflow> {
    let floor = previous
        .checked_add_signed(smallest_step())
        .ok_or(TimestampOverflow(previous))?;
    Ok(if now > floor { now } else { floor })
}

/// Parses an ISO-8601 timestamp string.
///
/// Accepts RFC 3339 with offset, naive date-times (`T` or space separated,
/// optional fraction) and bare dates (midnight UTC).
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, NoteValidationError> {
    let trimmed = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc).trunc_subsecs(6));
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed.and_utc().trunc_subsecs(6));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(NoteValidationError::InvalidTimestamp {
        field,
        value: value.to_string(),
    })
}

/// Encodes a timestamp for an `INTEGER` column.
pub fn to_storage(value: DateTime<Utc>) -> i64 {
    value.timestamp_micros()
}

/// Decodes an `INTEGER` column value; `None` when out of range.
pub fn from_storage(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
}
