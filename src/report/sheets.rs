//! Tabular sheets for spreadsheet export.

use serde::Serialize;

use crate::analyzers::grade::GRADE_ORDER;
use crate::analyzers::types::AggregationResult;
use crate::config::ReportConfig;
use crate::record::StudentRecord;

pub const SUMMARY_SHEET: &str = "Programme Summary";
pub const GRADE_SHEET: &str = "Grade Distribution";
pub const RAW_DATA_SHEET: &str = "Raw Data";
pub const SUBJECT_SHEET: &str = "Subject Breakdown";

/// A named grid of cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
        }
    }

    fn push<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }
}

/// The sheets of one analysis report, ready for a workbook writer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workbook {
    /// File name without extension.
    pub file_name: String,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// `<programme>_Analysis_Report`, with every non-alphanumeric character of the
/// programme name replaced by an underscore.
pub fn report_file_name(programme: Option<&str>) -> String {
    let stem: String = programme
        .unwrap_or("All Programmes")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}_Analysis_Report")
}

fn percent(rate: impl std::fmt::Display) -> String {
    format!("{rate}%")
}

/// The one-row headline sheet.
///
/// Rows with an empty result code never reach the aggregation, so the
/// "Total Withdraw" and "Blank" columns split the unrecognised result codes:
/// codes listed in [`ReportConfig::withdraw_codes`] count as withdrawals and
/// every other unrecognised code (`Incomplete`, `DNC`, ...) counts as blank.
fn summary_sheet(result: &AggregationResult, config: &ReportConfig) -> Sheet {
    let name = result
        .filter
        .subject
        .as_deref()
        .or(result.filter.programme.as_deref())
        .unwrap_or("All Programmes");

    let withdraw: usize = result
        .grades
        .unknown()
        .filter(|(label, _)| config.is_withdraw_code(label))
        .map(|(_, n)| n)
        .sum();
    let blank = result.unknown_count - withdraw;

    let mut sheet = Sheet::new(SUMMARY_SHEET);
    sheet.push(["Result Analysis Report"]);
    sheet.push([""]);
    sheet.push([
        "Programme Name",
        "Pass Rate",
        "Failure Rate",
        "Total EFTS",
        "Total Pass Students",
        "Total Fail",
        "Total Withdraw",
        "Blank",
    ]);
    sheet.push([
        name.to_string(),
        percent(result.pass_rate),
        percent(result.failure_rate),
        result.total_efts_display(),
        result.pass_count.to_string(),
        result.fail_count.to_string(),
        withdraw.to_string(),
        blank.to_string(),
    ]);
    sheet
}

fn grade_sheet(result: &AggregationResult) -> Sheet {
    let mut sheet = Sheet::new(GRADE_SHEET);
    sheet.push(["Grade Distribution"]);
    sheet.push([""]);
    sheet.push(["Grade", "Count", "Percentage"]);
    for (grade, count) in result.grades.iter() {
        sheet.push([
            grade.to_string(),
            count.to_string(),
            percent(result.grade_share(count)),
        ]);
    }
    sheet
}

fn raw_data_sheet(records: &[&StudentRecord]) -> Sheet {
    let mut headers: Vec<&str> = Vec::new();
    for record in records {
        for header in record.source.headers() {
            if !headers.contains(&header) {
                headers.push(header);
            }
        }
    }

    let mut sheet = Sheet::new(RAW_DATA_SHEET);
    sheet.push(headers.iter().copied());
    for record in records {
        let mut row = vec![String::new(); headers.len()];
        for (header, cell) in record.source.iter() {
            if let Some(i) = headers.iter().position(|h| *h == header) {
                row[i] = cell.display();
            }
        }
        sheet.rows.push(row);
    }
    sheet
}

fn subject_sheet(result: &AggregationResult) -> Sheet {
    let mut sheet = Sheet::new(SUBJECT_SHEET);
    let mut header = vec!["Subject", "Unit Code", "Total", "Pass Rate"];
    header.extend(GRADE_ORDER.iter().map(|g| g.label()));
    header.push("Other");
    sheet.push(header);

    for subject in &result.subjects {
        let mut row = vec![
            subject.name.clone(),
            subject.unit_code.clone(),
            subject.total.to_string(),
            percent(subject.pass_rate),
        ];
        row.extend(
            GRADE_ORDER
                .iter()
                .map(|g| subject.grades.grade(*g).to_string()),
        );
        row.push(subject.grades.unknown_total().to_string());
        sheet.rows.push(row);
    }
    sheet
}

/// Builds the export workbook for `result`.
///
/// `records` is the full record set; the raw-data sheet keeps only the rows the
/// result was computed from. The subject sheet is included when the result
/// spans more than one subject.
pub fn workbook<'a, I>(result: &AggregationResult, records: I, config: &ReportConfig) -> Workbook
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    let active = result.filter.select(records);

    let mut sheets = vec![
        summary_sheet(result, config),
        grade_sheet(result),
        raw_data_sheet(&active),
    ];
    if result.subjects.len() > 1 {
        sheets.push(subject_sheet(result));
    }

    Workbook {
        file_name: report_file_name(result.filter.programme.as_deref()),
        sheets,
    }
}
