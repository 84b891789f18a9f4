//! Data types produced by the aggregation engine.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::analyzers::grade::{GRADE_ORDER, Grade, GradeLabel};
use crate::analyzers::utility::{Rate, format_efts};
use crate::record::StudentRecord;

/// Restricts aggregation to one programme and/or one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub programme: Option<String>,
    pub subject: Option<String>,
}

impl Filter {
    /// No restriction.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn programme(programme: impl Into<String>) -> Self {
        Self {
            programme: Some(programme.into()),
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn matches(&self, record: &StudentRecord) -> bool {
        let programme_ok = self
            .programme
            .as_deref()
            .is_none_or(|p| record.programme == p);
        let subject_ok = self
            .subject
            .as_deref()
            .is_none_or(|s| record.subject() == s);
        programme_ok && subject_ok
    }

    /// The active subset of `records`, in input order.
    pub fn select<'a, I>(&self, records: I) -> Vec<&'a StudentRecord>
    where
        I: IntoIterator<Item = &'a StudentRecord>,
    {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Grade counts that always iterate in canonical order, followed by
/// unrecognised labels in the order they were first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeTally {
    canonical: [usize; 12],
    unknown: Vec<(String, usize)>,
}

impl GradeTally {
    pub fn add(&mut self, label: &GradeLabel) {
        match label {
            GradeLabel::Canonical(g) => self.canonical[g.rank()] += 1,
            GradeLabel::Unknown(code) => {
                match self.unknown.iter_mut().find(|(c, _)| c == code) {
                    Some((_, n)) => *n += 1,
                    None => self.unknown.push((code.clone(), 1)),
                }
            }
        }
    }

    pub fn grade(&self, grade: Grade) -> usize {
        self.canonical[grade.rank()]
    }

    /// Count for a label as it would be classified on input.
    pub fn get(&self, label: &str) -> usize {
        match GradeLabel::classify(label) {
            GradeLabel::Canonical(g) => self.grade(g),
            GradeLabel::Unknown(code) => self
                .unknown
                .iter()
                .find(|(c, _)| *c == code)
                .map_or(0, |(_, n)| *n),
        }
    }

    pub fn total(&self) -> usize {
        self.canonical.iter().sum::<usize>() + self.unknown_total()
    }

    pub fn unknown_total(&self) -> usize {
        self.unknown.iter().map(|(_, n)| n).sum()
    }

    /// Unrecognised labels with their counts, in first-seen order.
    pub fn unknown(&self) -> impl Iterator<Item = (&str, usize)> {
        self.unknown.iter().map(|(c, n)| (c.as_str(), *n))
    }

    /// Non-zero entries: canonical grades in order, then unknown labels.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        GRADE_ORDER
            .iter()
            .map(|g| (g.label(), self.canonical[g.rank()]))
            .filter(|(_, n)| *n > 0)
            .chain(self.unknown())
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Serialize for GradeTally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (label, count) in self.iter() {
            map.serialize_entry(label, &count)?;
        }
        map.end()
    }
}

/// Grade breakdown for one programme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgrammeSummary {
    pub name: String,
    pub grades: GradeTally,
    pub total: usize,
    pub efts: f64,
}

/// Grade breakdown and pass rate for one subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSummary {
    pub name: String,
    /// Unit code of the first record seen for this subject.
    pub unit_code: String,
    pub grades: GradeTally,
    pub total: usize,
    pub pass_count: usize,
    pub pass_rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EthnicityCount {
    pub ethnicity: String,
    pub count: usize,
    pub percentage: Rate,
}

/// Statistics for one active record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub filter: Filter,
    pub total_records: usize,
    pub unique_programmes: usize,
    pub unique_students: usize,
    pub grades: GradeTally,
    /// In first-seen order.
    pub programmes: Vec<ProgrammeSummary>,
    /// Ranked by enrollment, descending; ties keep first-seen order.
    pub subjects: Vec<SubjectSummary>,
    /// `None` when no active record carries an ethnicity.
    pub ethnicity: Option<Vec<EthnicityCount>>,
    pub pass_count: usize,
    pub excellent_count: usize,
    pub fail_count: usize,
    pub unknown_count: usize,
    pub pass_rate: Rate,
    pub excellence_rate: Rate,
    pub failure_rate: Rate,
    pub total_efts: f64,
}

impl AggregationResult {
    pub fn has_ethnicity_data(&self) -> bool {
        self.ethnicity.is_some()
    }

    /// The `n` most-enrolled subjects.
    pub fn top_subjects(&self, n: usize) -> &[SubjectSummary] {
        &self.subjects[..n.min(self.subjects.len())]
    }

    pub fn total_efts_display(&self) -> String {
        format_efts(self.total_efts)
    }

    /// Share of the active set for one grade, as a rate.
    pub fn grade_share(&self, count: usize) -> Rate {
        Rate::new(count, self.total_records)
    }
}

/// Outcome of an aggregation query.
///
/// `NoData` means the filter matched nothing, which is distinct from a
/// summary whose counts are all zero.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    NoData,
    Summary(Box<AggregationResult>),
}

impl Aggregation {
    pub fn summary(&self) -> Option<&AggregationResult> {
        match self {
            Aggregation::Summary(result) => Some(result.as_ref()),
            Aggregation::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Aggregation::NoData)
    }
}
