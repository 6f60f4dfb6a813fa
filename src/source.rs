use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    data::{ColumnKind, Value, infer_column_kind, typed_value},
    io_utils,
};

#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: encoding_rs::UTF_8,
        }
    }
}

/// The whole input file held in memory. Columns are addressed by position;
/// header text is kept for display only.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl SourceTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { headers, rows }
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cells at `index` in row order; short rows contribute nothing.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(index))
    }
}

pub fn read_source(path: &Path, options: &SourceOptions) -> Result<SourceTable> {
    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    info!(
        "Reading '{}' with delimiter '{}'",
        path.display(),
        crate::printable_delimiter(delimiter)
    );
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, options.encoding)
        .with_context(|| format!("Reading header from {path:?}"))?;
    if headers.is_empty() {
        bail!("No columns to parse from {}", display_path(path).display());
    }
    let width = headers.len();

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    let mut record = csv::ByteRecord::new();
    while reader
        .read_byte_record(&mut record)
        .with_context(|| format!("Reading {path:?}"))?
    {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.len() > width {
            bail!(
                "Line {line} of {} has {} fields but the header has {width}",
                display_path(path).display(),
                record.len()
            );
        }
        let decoded = io_utils::decode_record(&record, options.encoding)
            .with_context(|| format!("Decoding line {line}"))?;
        raw_rows.push(decoded);
    }

    let kinds = (0..width)
        .map(|idx| {
            infer_column_kind(
                raw_rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(String::as_str),
            )
        })
        .collect::<Vec<ColumnKind>>();
    debug!("Inferred column kinds: {kinds:?}");

    let rows = raw_rows
        .into_iter()
        .map(|row| {
            row.iter()
                .zip(&kinds)
                .map(|(raw, kind)| typed_value(raw, *kind))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    info!("Read {} row(s) across {width} column(s)", rows.len());
    Ok(SourceTable::new(headers, rows))
}

fn display_path(path: &Path) -> PathBuf {
    if io_utils::is_dash(path) {
        PathBuf::from("<stdin>")
    } else {
        path.to_path_buf()
    }
}
