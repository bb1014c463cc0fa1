//! Datetime normalisation.
//!
//! Everything that can reasonably describe a point in time (ISO strings,
//! dates, timezone-aware datetimes, unix seconds, CF-convention offsets) is
//! coerced to a second-precision [`NaiveDateTime`].

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::error::{IsobarError, Result};

/// Formats tried, in order, when parsing a datetime string.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%d%H%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

/// Something that can be interpreted as a datetime.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeValue {
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Utc(DateTime<Utc>),
    Text(String),
    /// Seconds since 1970-01-01T00:00:00
    UnixSeconds(f64),
}

impl From<NaiveDateTime> for TimeValue {
    fn from(value: NaiveDateTime) -> Self {
        TimeValue::DateTime(value)
    }
}

impl From<NaiveDate> for TimeValue {
    fn from(value: NaiveDate) -> Self {
        TimeValue::Date(value)
    }
}

impl From<DateTime<Utc>> for TimeValue {
    fn from(value: DateTime<Utc>) -> Self {
        TimeValue::Utc(value)
    }
}

impl From<&str> for TimeValue {
    fn from(value: &str) -> Self {
        TimeValue::Text(value.to_string())
    }
}

impl From<String> for TimeValue {
    fn from(value: String) -> Self {
        TimeValue::Text(value)
    }
}

/// Convert any supported time representation to a [`NaiveDateTime`] with
/// sub-second precision dropped.
pub fn to_datetime(value: impl Into<TimeValue>) -> Result<NaiveDateTime> {
    let dt = match value.into() {
        TimeValue::DateTime(dt) => dt,
        TimeValue::Date(date) => midnight(date),
        TimeValue::Utc(dt) => dt.naive_utc(),
        TimeValue::Text(text) => parse_datetime(&text)?,
        TimeValue::UnixSeconds(seconds) => {
            let whole = seconds.floor() as i64;
            DateTime::from_timestamp(whole, 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| IsobarError::invalid("time", format!("{} is out of range", seconds)))?
        }
    };
    Ok(dt.with_nanosecond(0).unwrap_or(dt))
}

/// Convert a list of times; fails on the first value that cannot be parsed.
pub fn to_datetimes<T: Into<TimeValue> + Clone>(values: &[T]) -> Result<Vec<NaiveDateTime>> {
    values.iter().cloned().map(to_datetime).collect()
}

/// Decode numeric CF-convention times such as `"hours since 1900-01-01 00:00:0.0"`.
pub fn decode_cf_times(values: &[f64], units: &str) -> Result<Vec<NaiveDateTime>> {
    let (step, reference) = units.split_once(" since ").ok_or_else(|| {
        IsobarError::invalid("units", format!("'{}' is not a CF time unit", units))
    })?;

    let seconds_per_unit = match step.trim().to_lowercase().as_str() {
        "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
        "minutes" | "minute" | "mins" | "min" => 60.0,
        "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
        "days" | "day" | "d" => 86400.0,
        other => {
            return Err(IsobarError::invalid(
                "units",
                format!("unsupported CF time step '{}'", other),
            ))
        }
    };

    let origin = parse_datetime(reference)?;
    values
        .iter()
        .map(|value| {
            if !value.is_finite() {
                return Err(IsobarError::invalid("time", "non-finite time offset"));
            }
            let seconds = (value * seconds_per_unit).round() as i64;
            origin
                .checked_add_signed(Duration::seconds(seconds))
                .ok_or_else(|| IsobarError::invalid("time", format!("{} is out of range", value)))
        })
        .collect()
}

fn parse_datetime(text: &str) -> Result<NaiveDateTime> {
    let trimmed = text
        .trim()
        .trim_end_matches(" UTC")
        .trim_end_matches('Z')
        .trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text.trim()) {
        return Ok(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }
    // Bare hours, e.g. "1900-01-01 00"
    if let Ok(dt) = NaiveDateTime::parse_from_str(&format!("{}:00", trimmed), "%Y-%m-%d %H:%M") {
        return Ok(dt);
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(midnight(date));
        }
    }
    Err(IsobarError::invalid(
        "time",
        format!("could not interpret '{}' as a datetime", text),
    ))
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}
