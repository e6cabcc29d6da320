//! I/O utilities for CSV reading, writing, encoding, and delimiter resolution.
//!
//! Both record sources funnel through [`read_table`], so HTTP bodies and local
//! files are decoded and split the same way:
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.
//! - **Quoting**: exported CSV uses `QuoteStyle::Always` for round-trip safety.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::{records::RawTable, records::RecordSet, source::FetchError};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    // Sheet exports drop trailing empty cells on some rows; accept ragged
    // records and let preparation pad them.
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_input(path: &Path) -> Result<Box<dyn Read>, FetchError> {
    if is_dash(path) {
        return Ok(Box::new(std::io::stdin().lock()));
    }
    let file = File::open(path).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Box::new(BufReader::new(file)))
}

/// Reads a headed CSV document into memory, decoding every field.
pub fn read_table<R>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
    origin: &str,
) -> Result<RawTable, FetchError>
where
    R: Read,
{
    let mut reader = open_csv_reader(reader, delimiter);
    let csv_error = |source| FetchError::Csv {
        origin: origin.to_string(),
        source,
    };
    let header_record = reader.byte_headers().map_err(csv_error)?.clone();
    let headers = decode_record(&header_record, encoding, origin)?;

    let mut rows = Vec::new();
    let mut record = csv::ByteRecord::new();
    while reader.read_byte_record(&mut record).map_err(csv_error)? {
        rows.push(decode_record(&record, encoding, origin)?);
    }
    Ok(RawTable { headers, rows })
}

pub fn decode_bytes(
    bytes: &[u8],
    encoding: &'static Encoding,
    origin: &str,
) -> Result<String, FetchError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(FetchError::Decode {
            origin: origin.to_string(),
            encoding: encoding.name(),
        })
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
    origin: &str,
) -> Result<Vec<String>, FetchError> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding, origin))
        .collect()
}

pub fn open_csv_writer(path: Option<&Path>, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let base: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true);
    Ok(builder.from_writer(base))
}

/// Writes the records of `set` with their source headers.
pub fn write_record_set(path: Option<&Path>, set: &RecordSet) -> Result<usize> {
    let delimiter = match path {
        Some(p) => resolve_input_delimiter(p, None),
        None => DEFAULT_CSV_DELIMITER,
    };
    let mut writer = open_csv_writer(path, delimiter)?;
    writer
        .write_record(set.headers())
        .context("Writing CSV headers")?;
    for record in set.iter() {
        writer
            .write_record(record.values())
            .context("Writing CSV row")?;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(set.len())
}
