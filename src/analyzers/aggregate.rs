use crate::analyzers::types::{
    Aggregation, AggregationResult, EthnicityCount, Filter, GradeTally, ProgrammeSummary,
    SubjectSummary,
};
use crate::analyzers::utility::Rate;
use crate::record::StudentRecord;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Returns the position of `key` in `items`, appending a new entry built by
/// `make` the first time the key is seen.
fn slot<'k, T>(
    index: &mut HashMap<&'k str, usize>,
    items: &mut Vec<T>,
    key: &'k str,
    make: impl FnOnce() -> T,
) -> usize {
    *index.entry(key).or_insert_with(|| {
        items.push(make());
        items.len() - 1
    })
}

/// Aggregates the records matching `filter` into an [`AggregationResult`].
///
/// Returns [`Aggregation::NoData`] when nothing matches. Grades outside the
/// classification table are counted in totals but never in the pass,
/// excellence or fail counts; D+ and D are likewise in none of the three.
pub fn aggregate<'a, I>(records: I, filter: &Filter) -> Aggregation
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    let active = filter.select(records);
    if active.is_empty() {
        debug!(?filter, "No records match filter");
        return Aggregation::NoData;
    }

    let total = active.len();

    let mut grades = GradeTally::default();
    let mut programmes: Vec<ProgrammeSummary> = Vec::new();
    let mut programme_index: HashMap<&str, usize> = HashMap::new();
    let mut subjects: Vec<SubjectSummary> = Vec::new();
    let mut subject_index: HashMap<&str, usize> = HashMap::new();
    let mut ethnicities: Vec<(String, usize)> = Vec::new();
    let mut ethnicity_index: HashMap<&str, usize> = HashMap::new();
    let mut students: HashSet<Cow<'a, str>> = HashSet::new();

    let mut total_efts = 0.0;
    let mut pass_count = 0;
    let mut excellent_count = 0;
    let mut fail_count = 0;

    for record in active {
        let label = record.grade();
        let canonical = label.canonical();
        let passed = canonical.is_some_and(|g| g.is_pass());

        grades.add(&label);

        let p = slot(
            &mut programme_index,
            &mut programmes,
            &record.programme,
            || ProgrammeSummary {
                name: record.programme.clone(),
                grades: GradeTally::default(),
                total: 0,
                efts: 0.0,
            },
        );
        programmes[p].grades.add(&label);
        programmes[p].total += 1;
        programmes[p].efts += record.efts_factor;

        let subject = record.subject();
        let s = slot(&mut subject_index, &mut subjects, subject, || {
            SubjectSummary {
                name: subject.to_string(),
                unit_code: record.unit_code.clone(),
                grades: GradeTally::default(),
                total: 0,
                pass_count: 0,
                pass_rate: Rate::default(),
            }
        });
        subjects[s].grades.add(&label);
        subjects[s].total += 1;
        if passed {
            subjects[s].pass_count += 1;
        }

        if let Some(ethnicity) = record.ethnicity() {
            let e = slot(&mut ethnicity_index, &mut ethnicities, ethnicity, || {
                (ethnicity.to_string(), 0)
            });
            ethnicities[e].1 += 1;
        }

        students.insert(record.identity_key());
        total_efts += record.efts_factor;

        if passed {
            pass_count += 1;
        }
        if canonical.is_some_and(|g| g.is_excellent()) {
            excellent_count += 1;
        }
        if canonical.is_some_and(|g| g.is_fail()) {
            fail_count += 1;
        }
    }

    for subject in &mut subjects {
        subject.pass_rate = Rate::new(subject.pass_count, subject.total);
    }
    // Stable sort keeps first-seen order among equal enrollments.
    subjects.sort_by(|a, b| b.total.cmp(&a.total));

    let ethnicity = if ethnicities.is_empty() {
        None
    } else {
        Some(
            ethnicities
                .into_iter()
                .map(|(ethnicity, count)| EthnicityCount {
                    ethnicity,
                    count,
                    percentage: Rate::new(count, total),
                })
                .collect(),
        )
    };

    let unknown_count = grades.unknown_total();

    debug!(
        total,
        programmes = programmes.len(),
        subjects = subjects.len(),
        unknown_count,
        "Aggregated records"
    );

    Aggregation::Summary(Box::new(AggregationResult {
        filter: filter.clone(),
        total_records: total,
        unique_programmes: programmes.len(),
        unique_students: students.len(),
        grades,
        programmes,
        subjects,
        ethnicity,
        pass_count,
        excellent_count,
        fail_count,
        unknown_count,
        pass_rate: Rate::new(pass_count, total),
        excellence_rate: Rate::new(excellent_count, total),
        failure_rate: Rate::new(fail_count, total),
        total_efts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::grade::{GRADE_ORDER, Grade};
    use crate::record::Row;

    fn record(programme: &str, unit: &str, grade: &str, efts: f64) -> StudentRecord {
        StudentRecord {
            programme: programme.to_string(),
            unit_code: unit.to_string(),
            unit_description: String::new(),
            grade_code: grade.to_string(),
            efts_factor: efts,
            ethnicity: None,
            student_identity: None,
            source: Row::new(),
        }
    }

    fn with_ethnicity(mut r: StudentRecord, ethnicity: &str) -> StudentRecord {
        r.ethnicity = Some(ethnicity.to_string());
        r
    }

    fn summary(records: &[StudentRecord], filter: &Filter) -> AggregationResult {
        match aggregate(records, filter) {
            Aggregation::Summary(result) => *result,
            Aggregation::NoData => panic!("expected a summary"),
        }
    }

    fn mixed_records() -> Vec<StudentRecord> {
        vec![
            record("BSc CS", "CS101", "A+", 0.125),
            record("BSc CS", "CS101", "B", 0.125),
            record("BSc CS", "CS102", "D+", 0.125),
            record("BSc CS", "CS102", "F", 0.125),
            record("BA", "HI101", "D", 0.25),
            record("BA", "HI101", "WD", 0.25),
            record("BA", "HI102", "c-", 0.25),
            record("BA", "HI102", "A-", 0.25),
        ]
    }

    #[test]
    fn test_two_record_scenario() {
        let records = vec![
            record("BSc CS", "CS101", "A", 0.125),
            record("BSc CS", "CS101", "F", 0.125),
        ];
        let result = summary(&records, &Filter::all());

        assert_eq!(result.total_records, 2);
        assert_eq!(result.pass_rate.to_string(), "50.0");
        assert_eq!(result.failure_rate.to_string(), "50.0");
        assert_eq!(result.excellence_rate.to_string(), "50.0");
        assert_eq!(result.total_efts_display(), "0.25");
        assert_eq!(result.unique_programmes, 1);
    }

    #[test]
    fn test_empty_input_is_no_data() {
        let records: Vec<StudentRecord> = Vec::new();
        assert!(aggregate(&records, &Filter::all()).is_no_data());
    }

    #[test]
    fn test_filtered_out_is_no_data() {
        let records = mixed_records();
        assert!(aggregate(&records, &Filter::programme("MBA")).is_no_data());
        assert!(
            aggregate(&records, &Filter::programme("BA").with_subject("CS101")).is_no_data()
        );
    }

    #[test]
    fn test_grade_counts_sum_to_total() {
        let records = mixed_records();
        let result = summary(&records, &Filter::all());
        let sum: usize = result.grades.iter().map(|(_, n)| n).sum();
        assert_eq!(sum, result.total_records);
        for programme in &result.programmes {
            assert_eq!(programme.grades.total(), programme.total);
        }
        for subject in &result.subjects {
            assert_eq!(subject.grades.total(), subject.total);
        }
    }

    #[test]
    fn test_partitions_are_disjoint_and_exhaustive() {
        let records = mixed_records();
        let result = summary(&records, &Filter::all());
        let d_band = result.grades.grade(Grade::DPlus) + result.grades.grade(Grade::D);

        assert_eq!(result.pass_count, 4);
        assert_eq!(result.fail_count, 1);
        assert_eq!(d_band, 2);
        assert_eq!(result.unknown_count, 1);
        assert_eq!(
            result.pass_count + result.fail_count + d_band + result.unknown_count,
            result.total_records
        );

        let total_pct = result.pass_rate.value()
            + result.failure_rate.value()
            + result.grade_share(d_band).value()
            + result.grade_share(result.unknown_count).value();
        assert!((total_pct - 100.0).abs() < 0.2);
    }

    #[test]
    fn test_d_band_excluded_from_rates() {
        let records = vec![
            record("P", "U1", "D+", 0.0),
            record("P", "U1", "D", 0.0),
        ];
        let result = summary(&records, &Filter::all());
        assert_eq!(result.pass_rate.to_string(), "0.0");
        assert_eq!(result.excellence_rate.to_string(), "0.0");
        assert_eq!(result.failure_rate.to_string(), "0.0");
    }

    #[test]
    fn test_unknown_grade_counted_but_unrated() {
        let records = vec![
            record("P", "U1", "A", 0.0),
            record("P", "U1", "Incomplete", 0.0),
        ];
        let result = summary(&records, &Filter::all());
        assert_eq!(result.total_records, 2);
        assert_eq!(result.grades.get("Incomplete"), 1);
        assert_eq!(result.pass_rate.to_string(), "50.0");
        assert_eq!(result.failure_rate.to_string(), "0.0");
    }

    #[test]
    fn test_grade_keyed_outputs_in_grade_order() {
        let records = vec![
            record("P", "U1", "F", 0.0),
            record("P", "U1", "X", 0.0),
            record("P", "U1", "C", 0.0),
            record("P", "U1", "a+", 0.0),
            record("P", "U1", "B-", 0.0),
        ];
        let result = summary(&records, &Filter::all());

        let expected = vec!["A+", "B-", "C", "F", "X"];
        let overall: Vec<&str> = result.grades.iter().map(|(g, _)| g).collect();
        assert_eq!(overall, expected);
        let programme: Vec<&str> = result.programmes[0].grades.iter().map(|(g, _)| g).collect();
        assert_eq!(programme, expected);
        let subject: Vec<&str> = result.subjects[0].grades.iter().map(|(g, _)| g).collect();
        assert_eq!(subject, expected);

        let canonical_positions: Vec<usize> = overall
            .iter()
            .filter_map(|g| GRADE_ORDER.iter().position(|c| c.label() == *g))
            .collect();
        assert!(canonical_positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_idempotent() {
        let records = mixed_records();
        let first = aggregate(&records, &Filter::programme("BA"));
        let second = aggregate(&records, &Filter::programme("BA"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_filter_composition() {
        let records = mixed_records();
        let by_programme = Filter::programme("BSc CS");
        let narrowed = by_programme.clone().with_subject("CS102");

        let subset = by_programme.select(&records);
        let restricted = aggregate(subset, &narrowed);
        let direct = aggregate(&records, &narrowed);

        assert_eq!(restricted, direct);
        assert_eq!(direct.summary().map(|r| r.total_records), Some(2));
    }

    #[test]
    fn test_subjects_ranked_by_enrollment_with_stable_ties() {
        let records = vec![
            record("P", "U1", "A", 0.0),
            record("P", "U2", "A", 0.0),
            record("P", "U2", "B", 0.0),
            record("P", "U3", "A", 0.0),
            record("P", "U4", "C", 0.0),
            record("P", "U4", "F", 0.0),
        ];
        let result = summary(&records, &Filter::all());
        let names: Vec<&str> = result.subjects.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["U2", "U4", "U1", "U3"]);
        assert_eq!(result.subjects[1].pass_rate.to_string(), "50.0");
    }

    #[test]
    fn test_top_subjects_truncates_to_limit() {
        let records: Vec<StudentRecord> = (0..12)
            .map(|i| record("P", &format!("U{i}"), "A", 0.0))
            .collect();
        let result = summary(&records, &Filter::all());
        assert_eq!(result.subjects.len(), 12);
        assert_eq!(result.top_subjects(10).len(), 10);
        assert_eq!(result.top_subjects(50).len(), 12);
    }

    #[test]
    fn test_unique_students_uses_identity_or_fallback() {
        let mut a = record("P", "U1", "A", 0.0);
        a.student_identity = Some("s1".to_string());
        let mut b = record("P", "U2", "B", 0.0);
        b.student_identity = Some("s1".to_string());
        let c = record("P", "U1", "A", 0.0);
        let d = record("P", "U1", "A", 0.0);
        let e = record("P", "U1", "F", 0.0);

        let records = vec![a, b, c, d, e];
        let result = summary(&records, &Filter::all());
        // s1, U1-A, U1-F
        assert_eq!(result.unique_students, 3);
    }

    #[test]
    fn test_ethnicity_absent_is_none() {
        let records = mixed_records();
        let result = summary(&records, &Filter::all());
        assert!(!result.has_ethnicity_data());
        assert!(result.ethnicity.is_none());
    }

    #[test]
    fn test_ethnicity_counts_in_first_seen_order() {
        let records = vec![
            with_ethnicity(record("P", "U1", "A", 0.0), "Pacific"),
            with_ethnicity(record("P", "U1", "B", 0.0), " Maori "),
            with_ethnicity(record("P", "U1", "C", 0.0), "Pacific"),
            with_ethnicity(record("P", "U1", "F", 0.0), "  "),
        ];
        let result = summary(&records, &Filter::all());
        let ethnicity = result.ethnicity.expect("ethnicity data");
        assert_eq!(ethnicity.len(), 2);
        assert_eq!(ethnicity[0].ethnicity, "Pacific");
        assert_eq!(ethnicity[0].count, 2);
        assert_eq!(ethnicity[0].percentage.to_string(), "50.0");
        assert_eq!(ethnicity[1].ethnicity, "Maori");
        assert_eq!(ethnicity[1].percentage.to_string(), "25.0");
    }

    #[test]
    fn test_programmes_in_first_seen_order_with_efts() {
        let records = mixed_records();
        let result = summary(&records, &Filter::all());
        let names: Vec<&str> = result.programmes.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["BSc CS", "BA"]);
        assert_eq!(result.programmes[0].efts, 0.5);
        assert_eq!(result.programmes[1].efts, 1.0);
        assert_eq!(result.total_efts_display(), "1.50");
    }
}
