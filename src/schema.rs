//! Canonical field resolution for transaction sheets.
//!
//! Restaurants keep their ledgers in spreadsheets whose column names drift
//! between templates (`userName` in one sheet, `Guest Name` in another). The
//! dashboard works against four logical fields instead and resolves each of
//! them once per loaded table through a declared priority table:
//!
//! | field       | candidates (first match wins) |
//! |-------------|-------------------------------|
//! | `identity`  | `userName`, `Guest Name`      |
//! | `category`  | `type`, `Status`              |
//! | `amount`    | `amount`, `Services`          |
//! | `timestamp` | `Timestamp`, `Date`           |
//!
//! Supporting a new sheet layout is a table edit (or a `columns:` override in
//! the configuration file), never a code change. A field without any matching
//! header is simply absent; consumers skip the feature that needs it.

use std::{collections::BTreeMap, fmt};

use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalField {
    Identity,
    Category,
    Amount,
    Timestamp,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 4] = [
        CanonicalField::Identity,
        CanonicalField::Category,
        CanonicalField::Amount,
        CanonicalField::Timestamp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Identity => "identity",
            CanonicalField::Category => "category",
            CanonicalField::Amount => "amount",
            CanonicalField::Timestamp => "timestamp",
        }
    }

    /// Human-facing label used in dashboard headings.
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalField::Identity => "Users/Guests",
            CanonicalField::Category => "Type/Status",
            CanonicalField::Amount => "Amount",
            CanonicalField::Timestamp => "Date",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_CANDIDATES: &[(CanonicalField, &[&str])] = &[
    (CanonicalField::Identity, &["userName", "Guest Name"]),
    (CanonicalField::Category, &["type", "Status"]),
    (CanonicalField::Amount, &["amount", "Services"]),
    (CanonicalField::Timestamp, &["Timestamp", "Date"]),
];

/// Ordered candidate header names per canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateTable {
    entries: BTreeMap<CanonicalField, Vec<String>>,
}

impl Default for CandidateTable {
    fn default() -> Self {
        let entries = DEFAULT_CANDIDATES
            .iter()
            .map(|(field, names)| (*field, names.iter().map(|n| n.to_string()).collect()))
            .collect();
        Self { entries }
    }
}

impl CandidateTable {
    /// Replaces the candidate list of every field named in `overrides`.
    /// Fields not mentioned keep their default candidates.
    pub fn with_overrides(overrides: &BTreeMap<CanonicalField, Vec<String>>) -> Self {
        let mut table = Self::default();
        for (field, names) in overrides {
            let cleaned = names
                .iter()
                .map(|n| n.trim())
                .filter(|n| !n.is_empty())
                .map(|n| n.to_string())
                .collect::<Vec<_>>();
            table.entries.insert(*field, cleaned);
        }
        table
    }

    pub fn candidates(&self, field: CanonicalField) -> &[String] {
        self.entries
            .get(&field)
            .map(|names| names.as_slice())
            .unwrap_or(&[])
    }

    pub fn resolve(&self, headers: &[String]) -> FieldMap {
        let cleaned = headers
            .iter()
            .map(|h| clean_header(h))
            .collect::<Vec<_>>();
        let mut columns = BTreeMap::new();
        for field in CanonicalField::ALL {
            let resolved = self.candidates(field).iter().find_map(|candidate| {
                cleaned
                    .iter()
                    .position(|header| *header == candidate.as_str())
                    .map(|index| ResolvedColumn {
                        index,
                        name: headers[index].clone(),
                    })
            });
            match resolved {
                Some(column) => {
                    debug!(
                        "Resolved {} to column '{}' (#{})",
                        field, column.name, column.index
                    );
                    columns.insert(field, column);
                }
                None => debug!("No column found for {field}; feature disabled"),
            }
        }
        FieldMap { columns }
    }
}

fn clean_header(header: &str) -> &str {
    header.trim_start_matches('\u{feff}').trim()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub index: usize,
    pub name: String,
}

/// Result of resolving a table's headers against a [`CandidateTable`].
///
/// Computed once when a table is prepared and carried alongside its records;
/// nothing downstream looks at raw header names again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldMap {
    columns: BTreeMap<CanonicalField, ResolvedColumn>,
}

impl FieldMap {
    pub fn column(&self, field: CanonicalField) -> Option<&ResolvedColumn> {
        self.columns.get(&field)
    }

    pub fn index(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).map(|c| c.index)
    }

    pub fn name(&self, field: CanonicalField) -> Option<&str> {
        self.columns.get(&field).map(|c| c.name.as_str())
    }

    pub fn is_resolved(&self, field: CanonicalField) -> bool {
        self.columns.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
