//! Time helpers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::ServiceError;

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Which end of an inclusive range a query bound describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Start,
    End,
}

/// Parse a query bound given as RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS`
/// (taken as UTC) or a bare `YYYY-MM-DD`.
///
/// A bare date covers the whole day: it maps to midnight for a start bound
/// and to the last representable instant of the day for an end bound.
pub fn parse_range_bound(
    value: &str,
    bound: RangeBound,
    field: &str,
) -> Result<Timestamp, ServiceError> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let time = match bound {
            RangeBound::Start => NaiveTime::MIN,
            RangeBound::End => NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
                .unwrap_or(NaiveTime::MIN),
        };
        return Ok(date.and_time(time).and_utc());
    }

    Err(ServiceError::invalid_field(
        format!("'{value}' is not a valid date or timestamp"),
        field,
    ))
}
