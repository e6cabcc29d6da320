//! Where transaction tables come from.
//!
//! A [`RecordSource`] produces one raw table per call and is expected to fail
//! now and then: sheets get unpublished, networks drop. Callers turn a
//! [`FetchError`] into an empty record set plus a warning instead of aborting.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use encoding_rs::{Encoding, UTF_8};
use log::info;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

use crate::{config::DataSource, io_utils, records::RawTable};

const SHEET_EXPORT_BASE: &str = "https://docs.google.com/spreadsheets/d";

/// CSV export endpoint of a published spreadsheet.
pub fn sheet_export_url(sheet_id: &str) -> String {
    format!("{SHEET_EXPORT_BASE}/{}/gviz/tq?tqx=out:csv", sheet_id.trim())
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Building HTTP client failed: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with HTTP status {status}")]
    Status { url: String, status: u16 },
    #[error("{url} returned an HTML page instead of CSV; is the sheet shared publicly?")]
    NotCsv { url: String },
    #[error("Reading {path:?} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed CSV from {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to decode {origin} with encoding {encoding}")]
    Decode {
        origin: String,
        encoding: &'static str,
    },
}

pub trait RecordSource {
    /// Stable identifier for cache lookups and log lines.
    fn key(&self) -> String;

    fn fetch(&self) -> Result<RawTable, FetchError>;
}

pub struct HttpSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self::with_client(url, client))
    }

    /// Uses a caller-configured client (proxy, TLS or timeout settings).
    pub fn with_client(url: impl Into<String>, client: reqwest::blocking::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RecordSource for HttpSource {
    fn key(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<RawTable, FetchError> {
        info!("Fetching transactions from {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|source| FetchError::Http {
                url: self.url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.to_ascii_lowercase().contains("text/html"));
        if is_html {
            return Err(FetchError::NotCsv {
                url: self.url.clone(),
            });
        }
        let body = response.bytes().map_err(|source| FetchError::Http {
            url: self.url.clone(),
            source,
        })?;
        io_utils::read_table(body.as_ref(), b',', UTF_8, &self.url)
    }
}

pub struct FileSource {
    path: PathBuf,
    delimiter: u8,
    encoding: &'static Encoding,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, delimiter: Option<u8>, encoding: &'static Encoding) -> Self {
        let path = path.into();
        let delimiter = io_utils::resolve_input_delimiter(&path, delimiter);
        Self {
            path,
            delimiter,
            encoding,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for FileSource {
    fn key(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn fetch(&self) -> Result<RawTable, FetchError> {
        info!("Reading transactions from {:?}", self.path);
        let reader = io_utils::open_input(&self.path)?;
        io_utils::read_table(reader, self.delimiter, self.encoding, &self.key())
    }
}

/// Builds the source configured for a restaurant.
pub fn open_source(source: &DataSource, timeout: Duration) -> Result<Box<dyn RecordSource>, FetchError> {
    match source {
        DataSource::File(path) => Ok(Box::new(FileSource::new(path.clone(), None, UTF_8))),
        DataSource::Url(url) => Ok(Box::new(HttpSource::new(url.clone(), timeout)?)),
    }
}
