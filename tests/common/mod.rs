#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use restaurant_dashboard::{
    records::{RawTable, RecordSet},
    schema::CandidateTable,
};
use tempfile::{TempDir, tempdir};

pub const RESTAURANT: &str = "Test Kitchen";
pub const PASSWORD: &str = "open-sesame";

pub const LEDGER_CSV: &str = "\
Timestamp,userName,type,amount
01/02/2024 09:00:00,Alice,sale,10
02/02/2024 10:30:00,Bob,refund,5
03/02/2024 11:00:00,Alice,sale,N/A
not a date,Carol,sale,99
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes a config pointing `Test Kitchen` at a local ledger, a matching
    /// secrets file and the ledger itself. Returns (config, secrets).
    pub fn write_dashboard(&self, ledger: &str) -> (PathBuf, PathBuf) {
        self.write("ledger.csv", ledger);
        let config = self.write(
            "config.json",
            r#"{"restaurants": {"Test Kitchen": {"path": "ledger.csv"}, "Offline Cafe": {"url": "http://127.0.0.1:9/ledger.csv"}}, "request_timeout_secs": 2}"#,
        );
        let secrets = self.write(
            "secrets.toml",
            "[restaurants]\ntest_kitchen = \"open-sesame\"\noffline_cafe = \"pw\"\n",
        );
        (config, secrets)
    }
}

pub fn raw_table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
    RawTable {
        headers: headers.iter().map(|h| h.to_string()).collect(),
        rows: rows
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect(),
    }
}

pub fn prepare(headers: &[&str], rows: &[&[&str]]) -> RecordSet {
    RecordSet::prepare(raw_table(headers, rows), &CandidateTable::default()).0
}
