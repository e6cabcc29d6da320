//! Session-scoped dashboard state.
//!
//! A [`Session`] exists only after a successful login. It owns the loaded
//! snapshot and the user's filter selection; refreshing swaps the snapshot
//! wholesale and ending the session drops both. Nothing here is shared
//! between sessions.

use std::fmt;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::{
    cache::SnapshotCache,
    dashboard::{self, DashboardView},
    filter::FilterSelection,
    records::{PrepareReport, RawTable, RecordSet},
    schema::CandidateTable,
    secrets::{AuthError, CredentialStore},
    source::RecordSource,
};

pub const NO_DATA_WARNING: &str = "No data loaded or all data filtered out!";

/// One immutable load of a restaurant's transactions.
#[derive(Debug, Clone)]
pub struct Snapshot {
    records: RecordSet,
    report: PrepareReport,
    fetched_at: DateTime<Utc>,
    from_cache: bool,
    warnings: Vec<String>,
}

impl Snapshot {
    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn report(&self) -> PrepareReport {
        self.report
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Fetches (through the cache) and prepares a snapshot. Never fails: a fetch
/// error becomes an empty snapshot carrying a warning.
pub fn load_snapshot(
    source: &dyn RecordSource,
    candidates: &CandidateTable,
    cache: &mut SnapshotCache<RawTable>,
    now: DateTime<Utc>,
) -> Snapshot {
    let key = source.key();
    match cache.get_or_try_fetch(&key, now, || source.fetch()) {
        Ok((raw, from_cache)) => {
            let fetched_at = cache
                .entry(&key)
                .map(|entry| entry.fetched_at())
                .unwrap_or(now);
            let (records, report) = RecordSet::prepare(raw, candidates);
            let mut warnings = Vec::new();
            if report.dropped_timestamp > 0 {
                warnings.push(format!(
                    "{} row(s) were dropped because their timestamp could not be parsed",
                    report.dropped_timestamp
                ));
            }
            if records.is_empty() {
                warnings.push(NO_DATA_WARNING.to_string());
            }
            info!(
                "Loaded {} of {} row(s) from {key}{}",
                report.kept,
                report.total_rows,
                if from_cache { " (cached)" } else { "" }
            );
            Snapshot {
                records,
                report,
                fetched_at,
                from_cache,
                warnings,
            }
        }
        Err(err) => {
            warn!("Loading transactions from {key} failed: {err}");
            Snapshot {
                records: RecordSet::empty(),
                report: PrepareReport::default(),
                fetched_at: now,
                from_cache: false,
                warnings: vec![
                    format!("Error loading data: {err}"),
                    NO_DATA_WARNING.to_string(),
                ],
            }
        }
    }
}

pub struct Session {
    restaurant: String,
    source: Box<dyn RecordSource>,
    candidates: CandidateTable,
    snapshot: Snapshot,
    selection: FilterSelection,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("restaurant", &self.restaurant)
            .field("source", &self.source.key())
            .field("rows", &self.snapshot.records.len())
            .field("selection", &self.selection)
            .finish()
    }
}

impl Session {
    /// Checks the password first; data is only loaded once it matches.
    pub fn login(
        credentials: &CredentialStore,
        restaurant: &str,
        password: &str,
        source: Box<dyn RecordSource>,
        candidates: CandidateTable,
        cache: &mut SnapshotCache<RawTable>,
    ) -> Result<Self, AuthError> {
        if let Err(err) = credentials.verify(restaurant, password) {
            warn!("Login to '{restaurant}' rejected");
            return Err(err);
        }
        info!("Access granted to {restaurant}");
        Ok(Self::open(restaurant, source, candidates, cache))
    }

    fn open(
        restaurant: &str,
        source: Box<dyn RecordSource>,
        candidates: CandidateTable,
        cache: &mut SnapshotCache<RawTable>,
    ) -> Self {
        let snapshot = load_snapshot(source.as_ref(), &candidates, cache, Utc::now());
        Self {
            restaurant: restaurant.to_string(),
            source,
            candidates,
            snapshot,
            selection: FilterSelection::all(),
        }
    }

    /// Drops the cached table and replaces the snapshot with a fresh load.
    ///
    /// The swap is unconditional: if the fetch fails the session continues
    /// with an empty snapshot and its warning. Explicit filter choices are
    /// kept; unnarrowed dimensions follow the new data.
    pub fn refresh(&mut self, cache: &mut SnapshotCache<RawTable>) {
        cache.invalidate(&self.source.key());
        info!("Refreshing transactions for {}", self.restaurant);
        self.snapshot = load_snapshot(self.source.as_ref(), &self.candidates, cache, Utc::now());
    }

    pub fn restaurant(&self) -> &str {
        &self.restaurant
    }

    pub fn source_key(&self) -> String {
        self.source.key()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut FilterSelection {
        &mut self.selection
    }

    pub fn set_selection(&mut self, selection: FilterSelection) {
        self.selection = selection;
    }

    pub fn reset_filters(&mut self) {
        self.selection = FilterSelection::all();
    }

    /// Runs the filter and aggregate pipeline over the current snapshot.
    pub fn view(&self) -> DashboardView {
        dashboard::build_view(&self.restaurant, &self.snapshot, &self.selection)
    }

    pub fn end(self) {
        info!("Session for {} ended", self.restaurant);
    }
}
