//! Row and record types shared by the reader, normalizer and aggregation engine.

use serde::Serialize;
use std::borrow::Cow;

use crate::analyzers::grade::GradeLabel;

/// A single scalar value read from a spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    /// Returns the cell as trimmed text, or `None` when the cell is empty or blank.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Cell::Number(n) if n.is_finite() => Some(format_number(*n)),
            Cell::Number(_) | Cell::Empty => None,
        }
    }

    /// Parses the cell as a number. Unparseable text yields `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Renders the cell the way it appears in an exported sheet.
    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Empty => String::new(),
        }
    }

    fn is_present(&self) -> bool {
        self.as_text().is_some()
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One spreadsheet row: header/value pairs in source column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Cell)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column. A repeated header keeps its first value.
    pub fn push(&mut self, header: impl Into<String>, value: Cell) {
        let header = header.into();
        if self.fields.iter().any(|(h, _)| *h == header) {
            return;
        }
        self.fields.push((header, value));
    }

    pub fn with(mut self, header: impl Into<String>, value: impl Into<Cell>) -> Self {
        self.push(header, value.into());
        self
    }

    /// Exact-header lookup that skips null and blank cells.
    pub fn get(&self, header: &str) -> Option<&Cell> {
        self.fields
            .iter()
            .find(|(h, v)| h == header && v.is_present())
            .map(|(_, v)| v)
    }

    /// Returns the first present cell whose header satisfies `matches`.
    pub fn find(&self, mut matches: impl FnMut(&str) -> bool) -> Option<&Cell> {
        self.fields
            .iter()
            .find(|(h, v)| matches(h.as_str()) && v.is_present())
            .map(|(_, v)| v)
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(h, _)| h.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.fields.iter().map(|(h, v)| (h.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A canonical student-unit result.
///
/// `source` keeps every original column so exports can reproduce the upload.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub programme: String,
    pub unit_code: String,
    pub unit_description: String,
    pub grade_code: String,
    pub efts_factor: f64,
    pub ethnicity: Option<String>,
    pub student_identity: Option<String>,
    pub source: Row,
}

impl StudentRecord {
    /// The subject a record belongs to: its unit description, or the unit code
    /// when the description is empty.
    pub fn subject(&self) -> &str {
        if self.unit_description.is_empty() {
            &self.unit_code
        } else {
            &self.unit_description
        }
    }

    pub fn grade(&self) -> GradeLabel {
        GradeLabel::classify(&self.grade_code)
    }

    /// Key used for unique-student counting.
    pub fn identity_key(&self) -> Cow<'_, str> {
        match &self.student_identity {
            Some(id) => Cow::Borrowed(id),
            None => Cow::Owned(format!("{}-{}", self.unit_code, self.grade_code)),
        }
    }

    /// Ethnicity value when present and non-blank.
    pub fn ethnicity(&self) -> Option<&str> {
        self.ethnicity
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}
