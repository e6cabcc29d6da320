//! Line-oriented dashboard session.
//!
//! Mirrors the dashboard workflow one command per line: pick a restaurant,
//! log in, narrow the filters, look at the summaries, refresh. At most one
//! session is live; selecting another restaurant or logging out ends it.

use std::{
    collections::BTreeSet,
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use log::info;

use crate::{
    cache::SnapshotCache,
    cli::{ShellArgs, parse_date},
    config::DashboardConfig,
    dashboard::render_text,
    filter::DateRange,
    io_utils,
    records::RawTable,
    schema::CanonicalField,
    secrets::CredentialStore,
    session::Session,
    source,
};

const HELP: &str = "\
Commands:
  restaurants                  list configured restaurants
  select <name>                choose a restaurant (ends the current session)
  login <password>             log in to the selected restaurant
  logout                       end the current session
  users <a,b,...>|all|none     filter users/guests
  categories <a,b,...>|all|none
                               filter transaction types/statuses
  dates <from> <to>|all        inclusive date range, '-' leaves a bound open
  reset                        clear every filter
  show [rows]                  print the dashboard
  refresh                      reload the data, bypassing the cache
  export <path>                write the filtered rows as CSV
  help                         show this text
  quit                         leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Restaurants,
    Select(String),
    Login(String),
    Logout,
    Values(CanonicalField, Option<BTreeSet<String>>),
    Dates(DateRange),
    Reset,
    Show(Option<usize>),
    Refresh,
    Export(PathBuf),
    Quit,
}

/// Parses one input line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (trimmed, ""),
    };
    let command = match verb.to_ascii_lowercase().as_str() {
        "help" | "?" => ShellCommand::Help,
        "restaurants" => ShellCommand::Restaurants,
        "select" => ShellCommand::Select(required(rest, "select <name>")?.to_string()),
        "login" => ShellCommand::Login(required(rest, "login <password>")?.to_string()),
        "logout" => ShellCommand::Logout,
        "users" => ShellCommand::Values(CanonicalField::Identity, parse_values(rest)?),
        "categories" => ShellCommand::Values(CanonicalField::Category, parse_values(rest)?),
        "dates" => ShellCommand::Dates(parse_dates(rest)?),
        "reset" => ShellCommand::Reset,
        "show" => ShellCommand::Show(if rest.is_empty() {
            None
        } else {
            Some(
                rest.parse()
                    .map_err(|_| format!("Invalid row count '{rest}'"))?,
            )
        }),
        "refresh" => ShellCommand::Refresh,
        "export" => ShellCommand::Export(PathBuf::from(required(rest, "export <path>")?)),
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("Unknown command '{other}'; type 'help'")),
    };
    Ok(Some(command))
}

fn required<'a>(rest: &'a str, usage: &str) -> Result<&'a str, String> {
    if rest.is_empty() {
        Err(format!("Usage: {usage}"))
    } else {
        Ok(rest)
    }
}

fn parse_values(rest: &str) -> Result<Option<BTreeSet<String>>, String> {
    match rest.to_ascii_lowercase().as_str() {
        "" => Err("Expected a comma separated list, 'all' or 'none'".to_string()),
        "all" => Ok(None),
        "none" => Ok(Some(BTreeSet::new())),
        _ => {
            let values = rest
                .split(',')
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
                .collect::<BTreeSet<_>>();
            if values.is_empty() {
                Err("Only blank values given; use 'none' to deselect everything".to_string())
            } else {
                Ok(Some(values))
            }
        }
    }
}

fn parse_dates(rest: &str) -> Result<DateRange, String> {
    if rest.eq_ignore_ascii_case("all") {
        return Ok(DateRange::default());
    }
    let parts = rest.split_whitespace().collect::<Vec<_>>();
    let [from, to] = parts.as_slice() else {
        return Err("Usage: dates <from> <to>|all".to_string());
    };
    let bound = |value: &str| {
        if value == "-" {
            Ok(None)
        } else {
            parse_date(value).map(Some)
        }
    };
    Ok(DateRange {
        start: bound(*from)?,
        end: bound(*to)?,
    })
}

pub struct Shell<'a> {
    config: &'a DashboardConfig,
    credentials: &'a CredentialStore,
    cache: SnapshotCache<RawTable>,
    selected: Option<String>,
    session: Option<Session>,
    rows: usize,
}

impl<'a> Shell<'a> {
    pub fn new(config: &'a DashboardConfig, credentials: &'a CredentialStore, rows: usize) -> Self {
        Self {
            config,
            credentials,
            cache: SnapshotCache::new(config.cache_ttl()),
            selected: None,
            session: None,
            rows,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn cache(&self) -> &SnapshotCache<RawTable> {
        &self.cache
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        for line in input.lines() {
            let line = line.context("Reading shell input")?;
            match parse_command(&line) {
                Ok(None) => {}
                Ok(Some(ShellCommand::Quit)) => break,
                Ok(Some(command)) => self.dispatch(command, out)?,
                Err(message) => writeln!(out, "error: {message}")?,
            }
        }
        self.end_session();
        Ok(())
    }

    pub fn dispatch<W: Write>(&mut self, command: ShellCommand, out: &mut W) -> Result<()> {
        match command {
            ShellCommand::Help => writeln!(out, "{HELP}")?,
            ShellCommand::Restaurants => {
                for name in self.config.names() {
                    let marker = if self.selected.as_deref() == Some(name) { "*" } else { " " };
                    writeln!(out, "{marker} {name}")?;
                }
            }
            ShellCommand::Select(name) => self.select(&name, out)?,
            ShellCommand::Login(password) => self.login(&password, out)?,
            ShellCommand::Logout => {
                if self.session.is_some() {
                    self.end_session();
                    writeln!(out, "Logged out")?;
                } else {
                    writeln!(out, "Not logged in")?;
                }
            }
            ShellCommand::Quit => {}
            other => self.with_session(other, out)?,
        }
        Ok(())
    }

    pub fn select<W: Write>(&mut self, name: &str, out: &mut W) -> Result<()> {
        let config = self.config;
        match config.restaurant(name) {
            Ok((canonical, _)) => {
                self.end_session();
                self.selected = Some(canonical.to_string());
                writeln!(out, "Selected {canonical}")?;
            }
            Err(err) => writeln!(out, "error: {err}")?,
        }
        Ok(())
    }

    fn login<W: Write>(&mut self, password: &str, out: &mut W) -> Result<()> {
        let Some(name) = self.selected.clone() else {
            writeln!(out, "error: select a restaurant first")?;
            return Ok(());
        };
        let config = self.config;
        let entry = match config.restaurant(&name) {
            Ok((_, entry)) => entry,
            Err(err) => {
                writeln!(out, "error: {err}")?;
                return Ok(());
            }
        };
        let record_source = match entry
            .data_source(&name)
            .map_err(anyhow::Error::from)
            .and_then(|ds| Ok(source::open_source(&ds, config.request_timeout())?))
        {
            Ok(record_source) => record_source,
            Err(err) => {
                writeln!(out, "error: {err}")?;
                return Ok(());
            }
        };
        self.end_session();
        match Session::login(
            self.credentials,
            &name,
            password,
            record_source,
            config.candidate_table(),
            &mut self.cache,
        ) {
            Ok(session) => {
                writeln!(out, "Access granted to {name}!")?;
                report_load(&session, out)?;
                self.session = Some(session);
            }
            Err(err) => writeln!(out, "{err}")?,
        }
        Ok(())
    }

    fn with_session<W: Write>(&mut self, command: ShellCommand, out: &mut W) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            writeln!(out, "error: log in first")?;
            return Ok(());
        };
        match command {
            ShellCommand::Values(field, allowed) => {
                session.selection_mut().set_allowed(field, allowed);
                writeln!(out, "{} filter updated", field.label())?;
            }
            ShellCommand::Dates(range) => {
                session.selection_mut().dates = range;
                writeln!(out, "Date filter updated")?;
            }
            ShellCommand::Reset => {
                session.reset_filters();
                writeln!(out, "Filters cleared")?;
            }
            ShellCommand::Show(rows) => {
                let view = session.view();
                write!(out, "{}", render_text(&view, rows.unwrap_or(self.rows)))?;
            }
            ShellCommand::Refresh => {
                session.refresh(&mut self.cache);
                writeln!(out, "Data refreshed")?;
                report_load(session, out)?;
            }
            ShellCommand::Export(path) => {
                let view = session.view();
                let written = io_utils::write_record_set(Some(&path), &view.records)
                    .with_context(|| format!("Exporting filtered rows to {path:?}"))?;
                writeln!(out, "Exported {written} row(s) to {}", path.display())?;
            }
            _ => {}
        }
        Ok(())
    }

    fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.end();
        }
    }
}

fn report_load<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    let snapshot = session.snapshot();
    writeln!(out, "Loaded {} row(s)", snapshot.records().len())?;
    for warning in snapshot.warnings() {
        writeln!(out, "Warning: {warning}")?;
    }
    Ok(())
}

pub fn execute(args: &ShellArgs) -> Result<()> {
    let config = DashboardConfig::load(&args.config)
        .with_context(|| format!("Loading configuration from {:?}", args.config))?;
    let credentials = CredentialStore::load(&args.secrets)?;
    let mut shell = Shell::new(&config, &credentials, args.rows);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Some(name) = &args.restaurant {
        shell.select(name, &mut out)?;
    }
    info!("Reading shell commands from stdin");
    shell.run(io::stdin().lock(), &mut out)?;
    out.flush()?;
    Ok(())
}
