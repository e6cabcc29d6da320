//! Day-first timestamp parsing.
//!
//! Sheets exported from form tools write `03/04/2024 10:00:00` for 3 April.
//! Every slash, dash and dot separated value is read day-first; ISO values
//! (`2024-04-03`, optionally with a time) are accepted as well since they are
//! unambiguous. A value that matches none of the formats is missing.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::{records::RecordSet, schema::CanonicalField};

const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S%.f",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];

/// Parses `value` day-first. Date-only values land on midnight.
pub fn parse_day_first(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(parsed);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(parsed.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Parses a calendar date given on the command line or in the shell.
pub fn parse_selection_date(value: &str) -> Option<NaiveDate> {
    parse_day_first(value).map(|dt| dt.date())
}

/// Inclusive span of dates observed in a record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub fn observed_span(records: &RecordSet) -> Option<DateSpan> {
    if !records.fields().is_resolved(CanonicalField::Timestamp) {
        return None;
    }
    let mut dates = records
        .iter()
        .filter_map(|record| record.timestamp())
        .map(|ts| ts.date());
    let first = dates.next()?;
    let (start, end) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some(DateSpan { start, end })
}
