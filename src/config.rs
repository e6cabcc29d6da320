//! Restaurant configuration.
//!
//! The file maps each restaurant's display name to where its transactions
//! live. JSON and YAML are both accepted, chosen by extension:
//!
//! ```yaml
//! restaurants:
//!   Main Street Diner:
//!     sheet_id: 1AbCdEf
//!   Test Kitchen:
//!     path: data/test_kitchen.csv
//! cache_ttl_secs: 300
//! columns:
//!   identity: [userName, Guest Name, Customer]
//! ```
//!
//! Relative `path` entries are resolved against the configuration file's
//! directory.

use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    cache::{self, DEFAULT_TTL_SECS},
    schema::{CandidateTable, CanonicalField},
    source::sheet_export_url,
};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown restaurant '{0}'")]
    UnknownRestaurant(String),
    #[error("Restaurant '{0}' has no path, url or sheet_id configured")]
    MissingSource(String),
    #[error("Unsupported configuration format {0:?}; expected .json, .yml or .yaml")]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    pub fn describe(&self) -> String {
        match self {
            DataSource::File(path) => path.display().to_string(),
            DataSource::Url(url) => url.clone(),
        }
    }
}

impl RestaurantEntry {
    /// Source for this restaurant: `path` wins over `url`, which wins over
    /// `sheet_id`.
    pub fn data_source(&self, name: &str) -> Result<DataSource, ConfigError> {
        if let Some(path) = &self.path {
            return Ok(DataSource::File(path.clone()));
        }
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(DataSource::Url(url.trim().to_string()));
        }
        match self.sheet_id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(id) => Ok(DataSource::Url(sheet_export_url(id))),
            None => Err(ConfigError::MissingSource(name.to_string())),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub restaurants: BTreeMap<String, RestaurantEntry>,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub columns: BTreeMap<CanonicalField, Vec<String>>,
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let mut config: DashboardConfig = match extension.as_deref() {
            Some("json") => serde_json::from_reader(reader)
                .with_context(|| format!("Parsing JSON config {path:?}"))?,
            Some("yml" | "yaml") => serde_yaml::from_reader(reader)
                .with_context(|| format!("Parsing YAML config {path:?}"))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf()).into()),
        };
        if let Some(base) = path.parent() {
            config.resolve_relative_paths(base);
        }
        Ok(config)
    }

    fn resolve_relative_paths(&mut self, base: &Path) {
        for entry in self.restaurants.values_mut() {
            if let Some(p) = entry.path.as_mut()
                && p.is_relative()
                && p.as_path() != Path::new("-")
            {
                *p = base.join(&*p);
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.restaurants.keys().map(|k| k.as_str())
    }

    /// Looks a restaurant up by display name, falling back to a
    /// case-insensitive match. Returns the canonical name with the entry.
    pub fn restaurant(&self, name: &str) -> Result<(&str, &RestaurantEntry), ConfigError> {
        let wanted = name.trim();
        if let Some((key, entry)) = self.restaurants.get_key_value(wanted) {
            return Ok((key.as_str(), entry));
        }
        self.restaurants
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(wanted))
            .map(|(key, entry)| (key.as_str(), entry))
            .ok_or_else(|| ConfigError::UnknownRestaurant(wanted.to_string()))
    }

    pub fn candidate_table(&self) -> CandidateTable {
        CandidateTable::with_overrides(&self.columns)
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        cache::ttl_from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
