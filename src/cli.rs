use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    filter::{DateRange, FilterSelection},
    temporal,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Filter and summarise restaurant transaction sheets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the restaurants defined in a configuration file
    Restaurants(RestaurantsArgs),
    /// Log in, filter the restaurant's transactions and print the summaries
    View(ViewArgs),
    /// Run an interactive dashboard session driven by commands on stdin
    Shell(ShellArgs),
}

#[derive(Debug, Args)]
pub struct RestaurantsArgs {
    /// Restaurant configuration file (.json, .yml or .yaml)
    #[arg(short, long)]
    pub config: PathBuf,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    /// Restaurant configuration file (.json, .yml or .yaml)
    #[arg(short, long)]
    pub config: PathBuf,
    /// TOML file holding the per-restaurant passwords
    #[arg(short, long)]
    pub secrets: PathBuf,
    /// Restaurant display name as listed in the configuration
    #[arg(short, long)]
    pub restaurant: String,
    /// Shared password for the restaurant
    #[arg(short, long, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Only keep these users/guests (repeatable or comma separated)
    #[arg(short = 'u', long = "user", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub users: Vec<String>,
    /// Deselect every user/guest
    #[arg(long = "no-users", conflicts_with = "users")]
    pub no_users: bool,
    /// Only keep these transaction types/statuses (repeatable or comma separated)
    #[arg(short = 't', long = "category", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub categories: Vec<String>,
    /// Deselect every transaction type/status
    #[arg(long = "no-categories", conflicts_with = "categories")]
    pub no_categories: bool,
    /// First day to include (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,
    /// Read transactions from this CSV file instead of the configured source
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// CSV delimiter character for --input (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of --input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Maximum transaction rows to display (0 = all)
    #[arg(long, default_value_t = 20)]
    pub rows: usize,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
    /// Also write the filtered rows to this CSV file
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

impl ViewArgs {
    /// Turns the filter flags into a selection. A value list that is blank
    /// after trimming is rejected; only `--no-users`/`--no-categories` ask
    /// for an empty choice.
    pub fn selection(&self) -> Result<FilterSelection> {
        let mut selection = FilterSelection::all().with_dates(DateRange {
            start: self.from,
            end: self.to,
        });
        if self.no_users {
            selection = selection.with_identities(Vec::<String>::new());
        } else if !self.users.is_empty() {
            selection = selection.with_identities(trimmed(&self.users, "--user", "--no-users")?);
        }
        if self.no_categories {
            selection = selection.with_categories(Vec::<String>::new());
        } else if !self.categories.is_empty() {
            selection =
                selection.with_categories(trimmed(&self.categories, "--category", "--no-categories")?);
        }
        Ok(selection)
    }
}

fn trimmed(values: &[String], flag: &str, none_flag: &str) -> Result<Vec<String>> {
    let kept = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .collect::<Vec<_>>();
    if kept.is_empty() {
        bail!("{flag} was given only blank values; use {none_flag} to deselect everything");
    }
    Ok(kept)
}

#[derive(Debug, Args)]
pub struct ShellArgs {
    /// Restaurant configuration file (.json, .yml or .yaml)
    #[arg(short, long)]
    pub config: PathBuf,
    /// TOML file holding the per-restaurant passwords
    #[arg(short, long)]
    pub secrets: PathBuf,
    /// Restaurant to preselect before reading commands
    #[arg(short, long)]
    pub restaurant: Option<String>,
    /// Maximum transaction rows shown by `show` (0 = all)
    #[arg(long, default_value_t = 20)]
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    temporal::parse_selection_date(value)
        .ok_or_else(|| format!("Invalid date '{value}'; expected YYYY-MM-DD or DD/MM/YYYY"))
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
