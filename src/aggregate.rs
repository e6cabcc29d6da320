use std::collections::BTreeMap;

use log::warn;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{records::RecordSet, schema::CanonicalField};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: Decimal,
    pub rows: usize,
}

/// Sum of amounts grouped by one canonical field, ordered by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    pub field: CanonicalField,
    pub column: String,
    pub groups: Vec<GroupTotal>,
}

impl Aggregate {
    /// Sum over every group; `None` if it overflows.
    pub fn total(&self) -> Option<Decimal> {
        self.groups
            .iter()
            .try_fold(Decimal::ZERO, |acc, g| acc.checked_add(g.total))
    }

    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.groups.iter().find(|g| g.key == key).map(|g| g.total)
    }

    /// Percentage of the aggregate total contributed by `key`.
    /// `None` when the total is zero or the division overflows.
    pub fn share(&self, key: &str) -> Option<Decimal> {
        let total = self.total()?;
        if total.is_zero() {
            return None;
        }
        self.get(key)?
            .checked_div(total)?
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|share| share.round_dp(2))
    }

    pub fn as_map(&self) -> BTreeMap<&str, Decimal> {
        self.groups
            .iter()
            .map(|g| (g.key.as_str(), g.total))
            .collect()
    }
}

pub fn by_category(set: &RecordSet) -> Option<Aggregate> {
    aggregate_by(set, CanonicalField::Category)
}

pub fn by_identity(set: &RecordSet) -> Option<Aggregate> {
    aggregate_by(set, CanonicalField::Identity)
}

/// Groups amounts by `field`.
///
/// Returns `None` when the aggregate cannot be computed: the grouping or
/// amount field is absent, the set is empty, or no row carries both a key and
/// an amount. Rows with a missing amount never count as zero. A row whose
/// amount would overflow its group's sum is left out with a warning.
pub fn aggregate_by(set: &RecordSet, field: CanonicalField) -> Option<Aggregate> {
    let column = set.fields().name(field)?.to_string();
    if !set.fields().is_resolved(CanonicalField::Amount) || set.is_empty() {
        return None;
    }
    let mut groups: BTreeMap<&str, (Decimal, usize)> = BTreeMap::new();
    for record in set {
        let (Some(key), Some(amount)) = (set.key(record, field), record.amount()) else {
            continue;
        };
        let entry = groups.entry(key).or_insert((Decimal::ZERO, 0));
        match entry.0.checked_add(amount) {
            Some(sum) => {
                entry.0 = sum;
                entry.1 += 1;
            }
            None => warn!("Skipping amount {amount} for '{key}': {field} total would overflow"),
        }
    }
    if groups.is_empty() {
        return None;
    }
    Some(Aggregate {
        field,
        column,
        groups: groups
            .into_iter()
            .map(|(key, (total, rows))| GroupTotal {
                key: key.to_string(),
                total,
                rows,
            })
            .collect(),
    })
}
