//! Raw tables and prepared record sets.
//!
//! Preparation is the single place where a row's fate is decided:
//!
//! 1. headers are resolved to canonical fields ([`CandidateTable::resolve`]);
//! 2. when a timestamp field exists, each row's timestamp is parsed day-first
//!    and rows that fail are dropped;
//! 3. the amount cell is coerced once; failures leave the amount missing but
//!    keep the row.
//!
//! Everything downstream (filters, aggregates, display) works on the prepared
//! [`RecordSet`] and never re-reads raw header names.

use chrono::NaiveDateTime;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    data::{non_null, parse_amount},
    schema::{CandidateTable, CanonicalField, FieldMap},
    temporal::parse_day_first,
};

/// Decoded CSV document exactly as fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    values: Vec<String>,
    timestamp: Option<NaiveDateTime>,
    amount: Option<Decimal>,
}

impl Record {
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(|v| v.as_str())
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    pub fn amount(&self) -> Option<Decimal> {
        self.amount
    }
}

/// Counts describing what preparation did with each raw row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrepareReport {
    pub total_rows: usize,
    pub kept: usize,
    pub dropped_timestamp: usize,
    pub missing_amount: usize,
    pub padded_rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordSet {
    headers: Vec<String>,
    fields: FieldMap,
    records: Vec<Record>,
}

impl RecordSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn prepare(raw: RawTable, candidates: &CandidateTable) -> (Self, PrepareReport) {
        let fields = candidates.resolve(&raw.headers);
        let width = raw.headers.len();
        let timestamp_index = fields.index(CanonicalField::Timestamp);
        let amount_index = fields.index(CanonicalField::Amount);

        let mut report = PrepareReport {
            total_rows: raw.rows.len(),
            ..PrepareReport::default()
        };
        let mut records = Vec::with_capacity(raw.rows.len());

        for (row_idx, mut values) in raw.rows.into_iter().enumerate() {
            if values.len() < width {
                values.resize(width, String::new());
                report.padded_rows += 1;
            }
            let timestamp = match timestamp_index {
                Some(idx) => match parse_day_first(&values[idx]) {
                    Some(parsed) => Some(parsed),
                    None => {
                        debug!(
                            "Dropping row {} with unparseable timestamp '{}'",
                            row_idx + 2,
                            values[idx]
                        );
                        report.dropped_timestamp += 1;
                        continue;
                    }
                },
                None => None,
            };
            let amount = amount_index.and_then(|idx| parse_amount(&values[idx]));
            if amount_index.is_some() && amount.is_none() {
                report.missing_amount += 1;
            }
            records.push(Record {
                values,
                timestamp,
                amount,
            });
        }

        report.kept = records.len();
        if report.dropped_timestamp > 0 {
            warn!(
                "Dropped {} of {} row(s) with an unparseable timestamp",
                report.dropped_timestamp, report.total_rows
            );
        }
        let set = Self {
            headers: raw.headers,
            fields,
            records,
        };
        (set, report)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Non-blank value of `field` for `record`, if the field is resolved.
    pub fn key<'a>(&self, record: &'a Record, field: CanonicalField) -> Option<&'a str> {
        let index = self.fields.index(field)?;
        record.value(index).and_then(non_null)
    }

    /// Same headers and field map, different rows.
    pub(crate) fn project(&self, records: Vec<Record>) -> Self {
        Self {
            headers: self.headers.clone(),
            fields: self.fields.clone(),
            records,
        }
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
