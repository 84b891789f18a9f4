//! Chart-ready series built from an [`AggregationResult`].

use serde::Serialize;

use crate::analyzers::types::{AggregationResult, Filter, GradeTally};
use crate::analyzers::utility::Rate;
use crate::config::ReportConfig;

/// Shortens `label` to `budget` characters followed by `...` when it is longer.
pub fn truncate_label(label: &str, budget: usize) -> String {
    if label.chars().count() > budget {
        let head: String = label.chars().take(budget).collect();
        format!("{head}...")
    } else {
        label.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradePoint {
    pub grade: String,
    pub count: usize,
    pub color: String,
}

/// Headline figures shown above the charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Headline {
    pub total_records: usize,
    pub unique_programmes: usize,
    pub unique_students: usize,
    pub subject_count: usize,
    pub pass_rate: Rate,
    pub excellence_rate: Rate,
    pub failure_rate: Rate,
    pub total_efts: String,
}

/// One stacked bar per programme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgrammeBar {
    pub label: String,
    pub full_label: String,
    pub grades: Vec<GradePoint>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSlice {
    pub grade: String,
    pub count: usize,
    pub percentage: Rate,
    pub color: String,
}

/// One stacked bar per subject in the top-subjects view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectBar {
    pub label: String,
    pub full_label: String,
    pub unit_code: String,
    pub pass_rate: Rate,
    pub total_students: usize,
    pub grades: Vec<GradePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EthnicitySlice {
    pub ethnicity: String,
    pub count: usize,
    pub percentage: Rate,
    pub color: String,
}

/// Every series a dashboard renders for one aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub filter: Filter,
    pub headline: Headline,
    pub programmes: Vec<ProgrammeBar>,
    pub grades: Vec<GradeSlice>,
    pub top_subjects: Vec<SubjectBar>,
    /// `None` when the upload carries no ethnicity data.
    pub ethnicity: Option<Vec<EthnicitySlice>>,
}

impl ChartData {
    pub fn has_ethnicity_data(&self) -> bool {
        self.ethnicity.is_some()
    }
}

fn grade_points(tally: &GradeTally, config: &ReportConfig) -> Vec<GradePoint> {
    tally
        .iter()
        .map(|(grade, count)| GradePoint {
            grade: grade.to_string(),
            count,
            color: config.grade_color(grade).to_string(),
        })
        .collect()
}

/// Projects `result` into chart series. Truncation only touches display labels.
pub fn chart_data(result: &AggregationResult, config: &ReportConfig) -> ChartData {
    let headline = Headline {
        total_records: result.total_records,
        unique_programmes: result.unique_programmes,
        unique_students: result.unique_students,
        subject_count: result.subjects.len(),
        pass_rate: result.pass_rate,
        excellence_rate: result.excellence_rate,
        failure_rate: result.failure_rate,
        total_efts: result.total_efts_display(),
    };

    let programmes = result
        .programmes
        .iter()
        .map(|p| ProgrammeBar {
            label: truncate_label(&p.name, config.programme_label_budget),
            full_label: p.name.clone(),
            grades: grade_points(&p.grades, config),
            total: p.total,
        })
        .collect();

    let grades = result
        .grades
        .iter()
        .map(|(grade, count)| GradeSlice {
            grade: grade.to_string(),
            count,
            percentage: result.grade_share(count),
            color: config.grade_color(grade).to_string(),
        })
        .collect();

    let top_subjects = result
        .top_subjects(config.top_subjects)
        .iter()
        .map(|s| SubjectBar {
            label: truncate_label(&s.name, config.subject_label_budget),
            full_label: s.name.clone(),
            unit_code: s.unit_code.clone(),
            pass_rate: s.pass_rate,
            total_students: s.total,
            grades: grade_points(&s.grades, config),
        })
        .collect();

    let ethnicity = result.ethnicity.as_ref().map(|slices| {
        slices
            .iter()
            .enumerate()
            .map(|(i, e)| EthnicitySlice {
                ethnicity: e.ethnicity.clone(),
                count: e.count,
                percentage: e.percentage,
                color: config.ethnicity_color(i).to_string(),
            })
            .collect()
    });

    ChartData {
        filter: result.filter.clone(),
        headline,
        programmes,
        grades,
        top_subjects,
        ethnicity,
    }
}
