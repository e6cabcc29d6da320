//! Presentation boundary: the filtered records and the two summaries behind
//! the dashboard charts, rendered as text tables or JSON.

use std::{collections::BTreeSet, fmt::Write as _};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::info;
use serde::Serialize;

use crate::{
    aggregate::{self, Aggregate},
    cache::SnapshotCache,
    cli::{OutputFormat, ViewArgs},
    config::DashboardConfig,
    data::format_amount,
    filter::{self, FilterSelection},
    io_utils,
    records::{PrepareReport, RecordSet},
    schema::CanonicalField,
    secrets::CredentialStore,
    session::{Session, Snapshot},
    source::{self, FileSource, RecordSource},
    table::{self, Align},
    temporal::{self, DateSpan},
};

/// Values the user can pick from, taken from the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub identities: Vec<String>,
    pub categories: Vec<String>,
    pub span: Option<DateSpan>,
}

impl FilterOptions {
    pub fn observe(records: &RecordSet) -> Self {
        Self {
            identities: filter::distinct_values(records, CanonicalField::Identity),
            categories: filter::distinct_values(records, CanonicalField::Category),
            span: temporal::observed_span(records),
        }
    }

    pub fn values(&self, field: CanonicalField) -> &[String] {
        match field {
            CanonicalField::Identity => &self.identities,
            CanonicalField::Category => &self.categories,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub restaurant: String,
    pub fetched_at: DateTime<Utc>,
    pub from_cache: bool,
    pub report: PrepareReport,
    pub options: FilterOptions,
    pub selection: FilterSelection,
    pub loaded_rows: usize,
    pub records: RecordSet,
    pub by_category: Option<Aggregate>,
    pub by_identity: Option<Aggregate>,
    pub warnings: Vec<String>,
}

pub fn build_view(restaurant: &str, snapshot: &Snapshot, selection: &FilterSelection) -> DashboardView {
    let all = snapshot.records();
    let records = filter::filter_records(all, selection);
    let by_category = aggregate::by_category(&records);
    let by_identity = aggregate::by_identity(&records);
    let mut warnings = snapshot.warnings().to_vec();
    if !all.is_empty() && records.is_empty() {
        warnings.push("No rows match the current filters".to_string());
    }
    DashboardView {
        restaurant: restaurant.to_string(),
        fetched_at: snapshot.fetched_at(),
        from_cache: snapshot.from_cache(),
        report: snapshot.report(),
        options: FilterOptions::observe(all),
        selection: selection.clone(),
        loaded_rows: all.len(),
        records,
        by_category,
        by_identity,
        warnings,
    }
}

/// Text rendering. `row_limit` caps the transaction table (0 shows all).
pub fn render_text(view: &DashboardView, row_limit: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Restaurant: {}", view.restaurant);
    for warning in &view.warnings {
        let _ = writeln!(out, "Warning: {warning}");
    }
    if view.loaded_rows == 0 {
        return out;
    }

    let fields = view.records.fields();
    let _ = writeln!(out);
    let _ = writeln!(out, "Filters");
    for field in [CanonicalField::Identity, CanonicalField::Category] {
        if let Some(column) = fields.name(field) {
            let _ = writeln!(
                out,
                "  {} ({column}): {}",
                field.label(),
                describe_values(view.options.values(field), view.selection.allowed(field))
            );
        }
    }
    if let Some(column) = fields.name(CanonicalField::Timestamp) {
        let _ = writeln!(
            out,
            "  {} ({column}): {}",
            CanonicalField::Timestamp.label(),
            describe_dates(view)
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Transactions: {} of {} row(s)",
        view.records.len(),
        view.loaded_rows
    );
    if !view.records.is_empty() {
        let shown = if row_limit == 0 {
            view.records.len()
        } else {
            row_limit.min(view.records.len())
        };
        let rows = view
            .records
            .iter()
            .take(shown)
            .map(|record| record.values().to_vec())
            .collect::<Vec<_>>();
        out.push_str(&table::render_table(view.records.headers(), &rows));
        if shown < view.records.len() {
            let _ = writeln!(out, "... {} more row(s)", view.records.len() - shown);
        }
    }

    if let Some(by_category) = &view.by_category {
        let _ = writeln!(out);
        let _ = writeln!(out, "Total amount per {} ({})", by_category.field.label(), by_category.column);
        out.push_str(&render_totals(by_category, false));
    }
    if let Some(by_identity) = &view.by_identity {
        let _ = writeln!(out);
        let _ = writeln!(out, "Amount share per {} ({})", by_identity.field.label(), by_identity.column);
        out.push_str(&render_totals(by_identity, true));
    }
    out
}

fn describe_values(observed: &[String], allowed: Option<&BTreeSet<String>>) -> String {
    match allowed {
        None => format!("all {} selected", observed.len()),
        Some(set) if set.is_empty() => "none selected".to_string(),
        Some(set) => format!("{} selected: {}", set.len(), set.iter().join(", ")),
    }
}

fn describe_dates(view: &DashboardView) -> String {
    let Some(span) = view.options.span else {
        return "no dates observed".to_string();
    };
    let start = view.selection.dates.start.unwrap_or(span.start);
    let end = view.selection.dates.end.unwrap_or(span.end);
    if view.selection.dates.is_unbounded() {
        format!("{start} to {end}")
    } else {
        format!("{start} to {end} (observed {} to {})", span.start, span.end)
    }
}

fn render_totals(aggregate: &Aggregate, with_share: bool) -> String {
    let mut headers = vec![aggregate.column.clone(), "total".to_string(), "rows".to_string()];
    if with_share {
        headers.push("share".to_string());
    }
    let rows = aggregate
        .groups
        .iter()
        .map(|group| {
            let mut row = vec![
                group.key.clone(),
                format_amount(group.total),
                group.rows.to_string(),
            ];
            if with_share {
                row.push(
                    aggregate
                        .share(&group.key)
                        .map(|s| format!("{s:.2}%"))
                        .unwrap_or_else(|| "-".to_string()),
                );
            }
            row
        })
        .collect::<Vec<_>>();
    table::render_aligned(&headers, &rows, &[Align::Left, Align::Right, Align::Right, Align::Right])
}

pub fn render_json(view: &DashboardView) -> Result<String> {
    serde_json::to_string_pretty(view).context("Serializing dashboard view")
}

pub fn execute(args: &ViewArgs) -> Result<()> {
    let config = DashboardConfig::load(&args.config)
        .with_context(|| format!("Loading configuration from {:?}", args.config))?;
    let credentials = CredentialStore::load(&args.secrets)?;
    let (name, entry) = config.restaurant(&args.restaurant)?;
    let selection = args.selection()?;

    let record_source: Box<dyn RecordSource> = match &args.input {
        Some(path) => {
            let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
            Box::new(FileSource::new(path.clone(), args.delimiter, encoding))
        }
        None => {
            let data_source = entry.data_source(name)?;
            source::open_source(&data_source, config.request_timeout())?
        }
    };

    let mut cache = SnapshotCache::new(config.cache_ttl());
    let mut session = Session::login(
        &credentials,
        name,
        &args.password,
        record_source,
        config.candidate_table(),
        &mut cache,
    )?;
    session.set_selection(selection);

    let view = session.view();
    match args.format {
        OutputFormat::Table => print!("{}", render_text(&view, args.rows)),
        OutputFormat::Json => println!("{}", render_json(&view)?),
    }
    if let Some(path) = &args.output {
        let written = io_utils::write_record_set(Some(path), &view.records)
            .with_context(|| format!("Exporting filtered rows to {path:?}"))?;
        info!("Exported {written} row(s) to {path:?}");
    }
    session.end();
    Ok(())
}
