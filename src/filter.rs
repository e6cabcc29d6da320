//! Row filtering over a prepared record set.
//!
//! A [`FilterSelection`] carries one constraint per dimension. `None` on a
//! value dimension means the user never narrowed it, so every observed value
//! passes; `Some(set)` is an explicit choice and an empty set keeps nothing.
//! Dimensions whose canonical field is absent from the table are inert.
//!
//! Each dimension is an independent predicate over a single field, so the
//! combined filter is their conjunction and the order of application is
//! irrelevant.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    records::{Record, RecordSet},
    schema::CanonicalField,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Identity,
    Category,
    Date,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Identity, Dimension::Category, Dimension::Date];

    pub fn field(&self) -> CanonicalField {
        match self {
            Dimension::Identity => CanonicalField::Identity,
            Dimension::Category => CanonicalField::Category,
            Dimension::Date => CanonicalField::Timestamp,
        }
    }
}

/// Inclusive date bounds; an open bound defaults to the observed span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub identities: Option<BTreeSet<String>>,
    pub categories: Option<BTreeSet<String>>,
    #[serde(default)]
    pub dates: DateRange,
}

impl FilterSelection {
    /// Selection that keeps everything observed.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_identities<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identities = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_categories<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_dates(mut self, dates: DateRange) -> Self {
        self.dates = dates;
        self
    }

    pub fn allowed(&self, field: CanonicalField) -> Option<&BTreeSet<String>> {
        match field {
            CanonicalField::Identity => self.identities.as_ref(),
            CanonicalField::Category => self.categories.as_ref(),
            _ => None,
        }
    }

    /// Replaces the explicit choice for a value dimension. Ignored for fields
    /// that are not filterable by value.
    pub fn set_allowed(&mut self, field: CanonicalField, allowed: Option<BTreeSet<String>>) {
        match field {
            CanonicalField::Identity => self.identities = allowed,
            CanonicalField::Category => self.categories = allowed,
            _ => {}
        }
    }

    pub fn is_default(&self) -> bool {
        self.identities.is_none() && self.categories.is_none() && self.dates.is_unbounded()
    }
}

/// Keeps the records of `set` that pass every dimension of `selection`.
pub fn filter_records(set: &RecordSet, selection: &FilterSelection) -> RecordSet {
    let kept = set
        .iter()
        .filter(|record| {
            Dimension::ALL
                .iter()
                .all(|dimension| passes(set, record, selection, *dimension))
        })
        .cloned()
        .collect();
    set.project(kept)
}

/// Applies a single dimension of `selection`.
pub fn apply_dimension(
    set: &RecordSet,
    selection: &FilterSelection,
    dimension: Dimension,
) -> RecordSet {
    let kept = set
        .iter()
        .filter(|record| passes(set, record, selection, dimension))
        .cloned()
        .collect();
    set.project(kept)
}

fn passes(
    set: &RecordSet,
    record: &Record,
    selection: &FilterSelection,
    dimension: Dimension,
) -> bool {
    let field = dimension.field();
    if !set.fields().is_resolved(field) {
        return true;
    }
    match dimension {
        Dimension::Identity | Dimension::Category => match selection.allowed(field) {
            None => true,
            Some(allowed) => set
                .key(record, field)
                .is_some_and(|value| allowed.contains(value)),
        },
        Dimension::Date => {
            if selection.dates.is_unbounded() {
                return true;
            }
            record
                .timestamp()
                .is_some_and(|ts| selection.dates.contains(ts.date()))
        }
    }
}

/// Distinct non-blank values of `field`, in first-seen order.
pub fn distinct_values(set: &RecordSet, field: CanonicalField) -> Vec<String> {
    if !set.fields().is_resolved(field) {
        return Vec::new();
    }
    let mut seen = HashSet::new();
    set.iter()
        .filter_map(|record| set.key(record, field))
        .filter(|value| seen.insert(*value))
        .map(|value| value.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RawTable;
    use crate::schema::CandidateTable;

    fn sample() -> RecordSet {
        let raw = RawTable {
            headers: vec!["userName".into(), "type".into(), "amount".into(), "Timestamp".into()],
            rows: vec![
                vec!["Alice".into(), "sale".into(), "10".into(), "01/02/2024".into()],
                vec!["Bob".into(), "refund".into(), "5".into(), "02/02/2024".into()],
                vec!["".into(), "sale".into(), "3".into(), "03/02/2024".into()],
            ],
        };
        RecordSet::prepare(raw, &CandidateTable::default()).0
    }

    #[test]
    fn default_selection_keeps_everything_including_null_identities() {
        let set = sample();
        assert_eq!(filter_records(&set, &FilterSelection::all()).len(), 3);
    }

    #[test]
    fn explicit_identity_selection_excludes_null_identities() {
        let set = sample();
        let selection = FilterSelection::all().with_identities(["Alice", "Bob"]);
        assert_eq!(filter_records(&set, &selection).len(), 2);
    }

    #[test]
    fn empty_selection_keeps_nothing() {
        let set = sample();
        let selection = FilterSelection::all().with_categories(Vec::<String>::new());
        assert!(filter_records(&set, &selection).is_empty());
    }

    #[test]
    fn date_range_is_inclusive() {
        let set = sample();
        let day = |d| NaiveDate::from_ymd_opt(2024, 2, d).unwrap();
        let selection = FilterSelection::all().with_dates(DateRange::between(day(2), day(3)));
        let filtered = filter_records(&set, &selection);
        assert_eq!(filtered.len(), 2);

        let open_start = FilterSelection::all().with_dates(DateRange {
            start: None,
            end: Some(day(1)),
        });
        assert_eq!(filter_records(&set, &open_start).len(), 1);
    }

    #[test]
    fn inverted_range_keeps_nothing() {
        let set = sample();
        let day = |d| NaiveDate::from_ymd_opt(2024, 2, d).unwrap();
        let selection = FilterSelection::all().with_dates(DateRange::between(day(3), day(1)));
        assert!(filter_records(&set, &selection).is_empty());
    }

    #[test]
    fn absent_fields_make_dimensions_inert() {
        let raw = RawTable {
            headers: vec!["note".into()],
            rows: vec![vec!["a".into()], vec!["b".into()]],
        };
        let (set, _) = RecordSet::prepare(raw, &CandidateTable::default());
        let selection = FilterSelection::all()
            .with_identities(Vec::<String>::new())
            .with_categories(["sale"])
            .with_dates(DateRange::between(
                NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            ));
        assert_eq!(filter_records(&set, &selection).len(), 2);
    }

    #[test]
    fn distinct_values_preserve_first_seen_order() {
        let set = sample();
        assert_eq!(distinct_values(&set, CanonicalField::Category), ["sale", "refund"]);
        assert_eq!(distinct_values(&set, CanonicalField::Identity), ["Alice", "Bob"]);
    }
}
