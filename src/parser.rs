//! Spreadsheet row reader.
//!
//! Reads Excel and OpenDocument workbooks, delimited text exports (`.csv`,
//! `.tsv`) and JSON arrays of objects into open-ended [`Row`]s. Column names are kept verbatim; matching them to
//! record fields is the normalizer's job.

use calamine::{Data, Reader, open_workbook_auto};
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::record::{Cell, Row};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("IO error")]
    Io(#[from] std::io::Error),
    #[error("CSV error")]
    Csv(#[from] csv::Error),
    #[error("JSON parse error")]
    Json(#[from] serde_json::Error),
    #[error("workbook error")]
    Workbook(#[from] calamine::Error),
    #[error("workbook has no worksheets")]
    EmptyWorkbook,
    #[error("unsupported spreadsheet format: {0} (expected xlsx, xls, ods, csv, tsv or json)")]
    UnsupportedFormat(String),
    #[error("JSON input must be an array of objects")]
    NotATable,
}

/// Reads all rows from the file at `path`, choosing the format by extension.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is malformed, or has an
/// extension other than `xlsx`, `xlsm`, `xlsb`, `xls`, `ods`, `csv`, `tsv`,
/// `txt` or `json`.
pub fn read_rows(path: &Path) -> Result<Vec<Row>, ImportError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let rows = match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => parse_workbook(path)?,
        "csv" | "txt" => parse_delimited(File::open(path)?, b',')?,
        "tsv" => parse_delimited(File::open(path)?, b'\t')?,
        "json" => parse_json(&std::fs::read(path)?)?,
        other => return Err(ImportError::UnsupportedFormat(other.to_string())),
    };

    debug!(path = %path.display(), rows = rows.len(), "Read spreadsheet rows");
    Ok(rows)
}

/// Parses delimited text with a header row.
pub fn parse_delimited<R: Read>(reader: R, delimiter: u8) -> Result<Vec<Row>, ImportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let mut row = Row::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            let cell = if value.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(value.to_string())
            };
            row.push(header, cell);
        }
        rows.push(row);
    }

    Ok(rows)
}

fn cell_from_excel(value: &Data) -> Cell {
    match value {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        other => Cell::Text(other.to_string()),
    }
}

/// Reads the first worksheet of a workbook. The first row holds the headers;
/// rows with no values are skipped.
pub fn parse_workbook(path: &Path) -> Result<Vec<Row>, ImportError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::EmptyWorkbook)??;

    let mut lines = range.rows();
    let Some(header_cells) = lines.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_cells
        .iter()
        .map(|c| cell_from_excel(c).display())
        .collect();

    let mut rows = Vec::new();
    for line in lines {
        if line.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let mut row = Row::new();
        for (header, value) in headers.iter().zip(line) {
            row.push(header.as_str(), cell_from_excel(value));
        }
        rows.push(row);
    }

    Ok(rows)
}

fn cell_from_json(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::String(s) => Cell::Text(s),
        Value::Number(n) => n.as_f64().map_or(Cell::Empty, Cell::Number),
        Value::Bool(b) => Cell::Text(b.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

/// Parses a JSON array of flat objects, one object per row.
pub fn parse_json(bytes: &[u8]) -> Result<Vec<Row>, ImportError> {
    let Value::Array(items) = serde_json::from_slice::<Value>(bytes)? else {
        return Err(ImportError::NotATable);
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => {
                let mut row = Row::new();
                for (key, value) in map {
                    row.push(key, cell_from_json(value));
                }
                Ok(row)
            }
            _ => Err(ImportError::NotATable),
        })
        .collect()
}
