//! Grade vocabulary and the pass/excellence/fail partitions.

use serde::{Serialize, Serializer};
use std::fmt;

/// The twelve recognised letter grades, declared in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    APlus,
    A,
    AMinus,
    BPlus,
    B,
    BMinus,
    CPlus,
    C,
    CMinus,
    DPlus,
    D,
    F,
}

/// Canonical grade order used by every grade-keyed output.
pub const GRADE_ORDER: [Grade; 12] = [
    Grade::APlus,
    Grade::A,
    Grade::AMinus,
    Grade::BPlus,
    Grade::B,
    Grade::BMinus,
    Grade::CPlus,
    Grade::C,
    Grade::CMinus,
    Grade::DPlus,
    Grade::D,
    Grade::F,
];

impl Grade {
    pub fn label(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    /// Case-insensitive lookup of a result code, ignoring surrounding whitespace.
    pub fn parse(code: &str) -> Option<Grade> {
        let code = code.trim();
        GRADE_ORDER
            .iter()
            .copied()
            .find(|g| g.label().eq_ignore_ascii_case(code))
    }

    /// Position in [`GRADE_ORDER`].
    pub fn rank(self) -> usize {
        self as usize
    }

    /// A+ through C-.
    pub fn is_pass(self) -> bool {
        self <= Grade::CMinus
    }

    /// A+, A and A-.
    pub fn is_excellent(self) -> bool {
        self <= Grade::AMinus
    }

    pub fn is_fail(self) -> bool {
        self == Grade::F
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// A result code after classification. Codes outside the table keep their
/// original spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GradeLabel {
    Canonical(Grade),
    Unknown(String),
}

impl GradeLabel {
    pub fn classify(code: &str) -> GradeLabel {
        match Grade::parse(code) {
            Some(g) => GradeLabel::Canonical(g),
            None => GradeLabel::Unknown(code.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GradeLabel::Canonical(g) => g.label(),
            GradeLabel::Unknown(s) => s,
        }
    }

    pub fn canonical(&self) -> Option<Grade> {
        match self {
            GradeLabel::Canonical(g) => Some(*g),
            GradeLabel::Unknown(_) => None,
        }
    }
}

/// Orders grade labels canonically, keeping unknown labels after the twelve
/// recognised grades in the order they were first encountered.
pub fn order_labels<'a, I>(labels: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut canonical: Vec<Grade> = Vec::new();
    let mut unknown: Vec<&'a str> = Vec::new();
    for label in labels {
        match Grade::parse(label) {
            Some(g) => {
                if !canonical.contains(&g) {
                    canonical.push(g);
                }
            }
            None => {
                if !unknown.contains(&label) {
                    unknown.push(label);
                }
            }
        }
    }
    canonical.sort();

    let mut ordered: Vec<&'a str> = Vec::with_capacity(canonical.len() + unknown.len());
    for grade in canonical {
        ordered.push(grade.label());
    }
    ordered.extend(unknown);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_order_labels() {
        let labels: Vec<&str> = GRADE_ORDER.iter().map(|g| g.label()).collect();
        assert_eq!(
            labels,
            vec!["A+", "A", "A-", "B+", "B", "B-", "C+", "C", "C-", "D+", "D", "F"]
        );
        for (i, g) in GRADE_ORDER.iter().enumerate() {
            assert_eq!(g.rank(), i);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Grade::parse("a+"), Some(Grade::APlus));
        assert_eq!(Grade::parse(" b- "), Some(Grade::BMinus));
        assert_eq!(Grade::parse("f"), Some(Grade::F));
        assert_eq!(Grade::parse("E"), None);
        assert_eq!(Grade::parse("WD"), None);
        assert_eq!(Grade::parse(""), None);
    }

    #[test]
    fn test_partitions() {
        let pass: Vec<&str> = GRADE_ORDER
            .iter()
            .filter(|g| g.is_pass())
            .map(|g| g.label())
            .collect();
        assert_eq!(pass, vec!["A+", "A", "A-", "B+", "B", "B-", "C+", "C", "C-"]);

        let excellent: Vec<&str> = GRADE_ORDER
            .iter()
            .filter(|g| g.is_excellent())
            .map(|g| g.label())
            .collect();
        assert_eq!(excellent, vec!["A+", "A", "A-"]);

        let fail: Vec<&str> = GRADE_ORDER
            .iter()
            .filter(|g| g.is_fail())
            .map(|g| g.label())
            .collect();
        assert_eq!(fail, vec!["F"]);
    }

    #[test]
    fn test_d_band_outside_all_partitions() {
        for g in [Grade::DPlus, Grade::D] {
            assert!(!g.is_pass());
            assert!(!g.is_excellent());
            assert!(!g.is_fail());
        }
    }

    #[test]
    fn test_classify_keeps_unknown_spelling() {
        assert_eq!(GradeLabel::classify("a"), GradeLabel::Canonical(Grade::A));
        assert_eq!(
            GradeLabel::classify(" WD "),
            GradeLabel::Unknown("WD".to_string())
        );
        assert_eq!(GradeLabel::classify("a").as_str(), "A");
    }

    #[test]
    fn test_order_labels_unknown_last_in_encounter_order() {
        let ordered = order_labels(["F", "WD", "A", "E", "b+", "WD", "A"]);
        assert_eq!(ordered, vec!["A", "B+", "F", "WD", "E"]);
    }
}
