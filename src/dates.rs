//! Date and time normalization across provider wire formats.
//!
//! All-day values round-trip through a timezone-independent calendar date:
//! a bare date string is never reinterpreted as UTC midnight, so the day
//! cannot shift for users west of UTC. Timed values round-trip through
//! absolute instants; Graph datetimes that omit an offset are treated as
//! UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::SyncError;

/// Parse a bare `YYYY-MM-DD` all-day date.
pub fn parse_all_day_date(value: &str) -> Result<NaiveDate, SyncError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|err| SyncError::MalformedResponse(format!("bad all-day date {value:?}: {err}")))
}

/// Parse a Graph datetime such as `2026-02-20T10:00:00.0000000`, which
/// carries no offset. Values that do carry an offset are honored; bare
/// values are taken as UTC.
pub fn parse_graph_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Utc));
    }

    let with_suffix = format!("{value}Z");
    if let Ok(instant) = DateTime::parse_from_rfc3339(&with_suffix) {
        return Some(instant.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }

    None
}

/// Exclusive end date for providers whose all-day end is "last day + 1".
pub fn exclusive_end_date(inclusive_last_day: NaiveDate) -> NaiveDate {
    inclusive_last_day + chrono::Duration::days(1)
}

/// Inverse of [`exclusive_end_date`], for inbound translation.
pub fn inclusive_last_day(exclusive_end: NaiveDate) -> NaiveDate {
    exclusive_end - chrono::Duration::days(1)
}

/// Local-midnight wire form used by Graph all-day events.
pub fn graph_midnight(date: NaiveDate) -> String {
    format!("{}T00:00:00", date.format("%Y-%m-%d"))
}

/// Inclusive until-instant for a recurrence end date: the last second of
/// that day.
pub fn end_of_day_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(23, 59, 59)
        .expect("23:59:59 is a valid time")
        .and_utc()
}
