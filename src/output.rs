//! Output formatting and persistence for reports.
//!
//! Supports pretty-printing, JSON serialization, and writing a workbook either
//! as a single `.xlsx` file or as a directory of CSV sheets.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::record::Cell;
use crate::report::Workbook;
use csv::WriterBuilder;
use rust_xlsxwriter::Workbook as XlsxWorkbook;
use std::fs;
use std::path::{Path, PathBuf};

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes a value as pretty-printed JSON to `path`, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    debug!(path = %path.display(), "Wrote JSON");
    Ok(())
}

/// A sheet cell that reads back as exactly the same text when stored as a number.
fn numeric(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && Cell::Number(*n).display() == value)
}

/// Writes `workbook` as `<dir>/<file_name>.xlsx`, one worksheet per sheet.
///
/// Cells that are plain numbers are stored as numbers, everything else as text.
/// Returns the path of the written file.
pub fn write_xlsx(dir: &Path, workbook: &Workbook) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("{}.xlsx", workbook.file_name));

    let mut book = XlsxWorkbook::new();
    for sheet in &workbook.sheets {
        let worksheet = book.add_worksheet();
        worksheet.set_name(sheet.name.as_str())?;

        for (r, row) in sheet.rows.iter().enumerate() {
            let r = u32::try_from(r)?;
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let c = u16::try_from(c)?;
                match numeric(value) {
                    Some(n) => worksheet.write_number(r, c, n)?,
                    None => worksheet.write_string(r, c, value.as_str())?,
                };
            }
        }
        debug!(sheet = %sheet.name, rows = sheet.rows.len(), "Wrote worksheet");
    }

    book.save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(
        path = %path.display(),
        sheets = workbook.sheets.len(),
        "Workbook written"
    );
    Ok(path)
}

/// File name for a sheet: its name with spaces replaced by underscores.
pub fn sheet_file_name(sheet_name: &str) -> String {
    format!("{}.csv", sheet_name.replace(' ', "_"))
}

/// Writes every sheet of `workbook` as `<dir>/<file_name>/<Sheet_Name>.csv`.
///
/// Existing sheet files are overwritten. Returns the workbook directory.
pub fn write_workbook(dir: &Path, workbook: &Workbook) -> Result<PathBuf> {
    let book_dir = dir.join(&workbook.file_name);
    fs::create_dir_all(&book_dir)
        .with_context(|| format!("creating {}", book_dir.display()))?;

    for sheet in &workbook.sheets {
        let path = book_dir.join(sheet_file_name(&sheet.name));
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("opening {}", path.display()))?;

        for row in &sheet.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        debug!(sheet = %sheet.name, rows = sheet.rows.len(), "Wrote sheet");
    }

    info!(
        path = %book_dir.display(),
        sheets = workbook.sheets.len(),
        "Workbook written"
    );
    Ok(book_dir)
}
