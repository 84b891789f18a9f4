use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

use crate::analyzers::grade::{GRADE_ORDER, Grade};

/// Presentation settings injected into the report projector.
///
/// Stored as a JSON object on disk; every key is optional:
/// ```json
/// {
///   "grade_colors": { "A+": "#10b981", "F": "#b91c1c" },
///   "unknown_grade_color": "#6b7280",
///   "ethnicity_palette": ["#8b5cf6", "#06b6d4"],
///   "programme_label_budget": 20,
///   "subject_label_budget": 25,
///   "top_subjects": 10,
///   "withdraw_codes": ["W", "WD", "WDN"]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub grade_colors: HashMap<String, String>,
    pub unknown_grade_color: String,
    pub ethnicity_palette: Vec<String>,
    pub programme_label_budget: usize,
    pub subject_label_budget: usize,
    pub top_subjects: usize,
    pub withdraw_codes: Vec<String>,
}

const GRADE_PALETTE: [&str; 12] = [
    "#10b981", "#059669", "#047857", "#3b82f6", "#2563eb", "#1d4ed8", "#f59e0b", "#d97706",
    "#b45309", "#ef4444", "#dc2626", "#b91c1c",
];

const ETHNICITY_PALETTE: [&str; 8] = [
    "#8b5cf6", "#06b6d4", "#10b981", "#f59e0b", "#ef4444", "#6366f1", "#ec4899", "#84cc16",
];

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            grade_colors: GRADE_ORDER
                .iter()
                .zip(GRADE_PALETTE)
                .map(|(g, color)| (g.label().to_string(), color.to_string()))
                .collect(),
            unknown_grade_color: "#6b7280".to_string(),
            ethnicity_palette: ETHNICITY_PALETTE.iter().map(|c| c.to_string()).collect(),
            programme_label_budget: 20,
            subject_label_budget: 25,
            top_subjects: 10,
            withdraw_codes: vec!["W".into(), "WD".into(), "WDN".into()],
        }
    }
}

impl ReportConfig {
    /// Loads the config from a JSON file at `path`. Grade colours given in the
    /// file override the built-in palette one grade at a time; their keys are
    /// matched like result codes, and keys that are not grades are ignored.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading report config {path}"))?;
        let mut config: ReportConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing report config {path}"))?;

        let mut grade_colors = HashMap::new();
        for (key, color) in config.grade_colors.drain() {
            match Grade::parse(&key) {
                Some(grade) => {
                    grade_colors.insert(grade.label().to_string(), color);
                }
                None => warn!(key = %key, path, "Ignoring colour for unrecognised grade"),
            }
        }
        config.grade_colors = grade_colors;

        let defaults = ReportConfig::default();
        for (grade, color) in defaults.grade_colors {
            config.grade_colors.entry(grade).or_insert(color);
        }
        if config.ethnicity_palette.is_empty() {
            config.ethnicity_palette = defaults.ethnicity_palette;
        }
        Ok(config)
    }

    /// Colour for a grade label. Labels outside the table get the neutral colour.
    pub fn grade_color(&self, label: &str) -> &str {
        Grade::parse(label)
            .and_then(|g| self.grade_colors.get(g.label()))
            .unwrap_or(&self.unknown_grade_color)
    }

    /// Colour for the `index`-th ethnicity in first-seen order, cycling the palette.
    pub fn ethnicity_color(&self, index: usize) -> &str {
        if self.ethnicity_palette.is_empty() {
            return &self.unknown_grade_color;
        }
        &self.ethnicity_palette[index % self.ethnicity_palette.len()]
    }

    pub fn is_withdraw_code(&self, label: &str) -> bool {
        let label = label.trim();
        self.withdraw_codes
            .iter()
            .any(|code| code.eq_ignore_ascii_case(label))
    }
}
