//! Maps loosely-named spreadsheet columns onto [`StudentRecord`]s.
//!
//! Each semantic field has an ordered list of header spellings. The first
//! alias holding a non-blank value wins; when none match exactly, headers are
//! compared again with case, spaces, underscores and hyphens ignored.

use tracing::debug;

use crate::record::{Cell, Row, StudentRecord};

/// The semantic fields the normalizer extracts from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Programme,
    UnitCode,
    UnitDescription,
    GradeCode,
    EftsFactor,
    Ethnicity,
    StudentIdentity,
}

/// Header spellings per field, in lookup priority order.
pub static FIELD_ALIASES: &[(Field, &[&str])] = &[
    (
        Field::Programme,
        &["course desc", "Course Desc", "COURSE DESC", "courseDesc"],
    ),
    (
        Field::UnitCode,
        &["unit code", "Unit Code", "UNIT CODE", "unitCode"],
    ),
    (
        Field::UnitDescription,
        &[
            "unit offer description",
            "Unit Offer Description",
            "UNIT OFFER DESCRIPTION",
            "unitOfferDescription",
        ],
    ),
    (
        Field::GradeCode,
        &[
            "cuor result code",
            "Cuor Result Code",
            "CUOR RESULT CODE",
            "cuorResultCode",
        ],
    ),
    (
        Field::EftsFactor,
        &[
            "cuor efts factor",
            "Cuor Efts Factor",
            "CUOR EFTS FACTOR",
            "CUOR EFTS Factor",
            "cuorEftsFactor",
        ],
    ),
    (
        Field::Ethnicity,
        &[
            "ethnicity",
            "Ethnicity",
            "ETHNICITY",
            "ethnic group",
            "Ethnic Group",
            "ETHNIC GROUP",
            "race",
            "Race",
            "RACE",
        ],
    ),
    (
        Field::StudentIdentity,
        &["studentId", "student id", "Student ID", "STUDENT ID"],
    ),
];

impl Field {
    pub fn aliases(self) -> &'static [&'static str] {
        FIELD_ALIASES
            .iter()
            .find(|(f, _)| *f == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or_default()
    }
}

/// Header folded for loose comparison: lowercase with separators removed.
fn fold_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Looks up `field` in `row`, trying exact aliases before loose matches.
pub fn lookup(row: &Row, field: Field) -> Option<&Cell> {
    let aliases = field.aliases();
    if let Some(cell) = aliases.iter().find_map(|alias| row.get(alias)) {
        return Some(cell);
    }
    let folded: Vec<String> = aliases.iter().map(|a| fold_header(a)).collect();
    row.find(|header| {
        let header = fold_header(header);
        folded.iter().any(|f| *f == header)
    })
}

fn text(row: &Row, field: Field) -> Option<String> {
    lookup(row, field).and_then(Cell::as_text)
}

/// Builds a canonical record from `row`, or `None` when the programme, unit
/// code or grade is missing.
pub fn normalize_row(row: Row) -> Option<StudentRecord> {
    let programme = text(&row, Field::Programme)?;
    let unit_code = text(&row, Field::UnitCode)?;
    let grade_code = text(&row, Field::GradeCode)?;
    let unit_description = text(&row, Field::UnitDescription).unwrap_or_default();
    let efts_factor = lookup(&row, Field::EftsFactor)
        .and_then(Cell::as_number)
        .unwrap_or(0.0);
    let ethnicity = text(&row, Field::Ethnicity);
    let student_identity = text(&row, Field::StudentIdentity);

    Some(StudentRecord {
        programme,
        unit_code,
        unit_description,
        grade_code,
        efts_factor,
        ethnicity,
        student_identity,
        source: row,
    })
}

/// Result of normalizing a sheet.
#[derive(Debug, Default)]
pub struct Normalized {
    pub records: Vec<StudentRecord>,
    /// Rows dropped for a missing programme, unit code or grade.
    pub rejected: usize,
}

/// Normalizes every row, silently dropping rows that lack a required field.
pub fn normalize<I>(rows: I) -> Normalized
where
    I: IntoIterator<Item = Row>,
{
    let mut out = Normalized::default();
    for row in rows {
        match normalize_row(row) {
            Some(record) => out.records.push(record),
            None => out.rejected += 1,
        }
    }
    debug!(
        records = out.records.len(),
        rejected = out.rejected,
        "Normalized rows"
    );
    out
}
