use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::record::StudentRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgrammeCount {
    pub programme: String,
    pub count: usize,
}

/// Programmes with their record counts, most records first. Programmes with
/// equal counts keep the order they were first seen in.
pub fn programme_counts(records: &[StudentRecord]) -> Vec<ProgrammeCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<ProgrammeCount> = Vec::new();

    for record in records {
        let i = *index.entry(record.programme.as_str()).or_insert_with(|| {
            counts.push(ProgrammeCount {
                programme: record.programme.clone(),
                count: 0,
            });
            counts.len() - 1
        });
        counts[i].count += 1;
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Distinct subjects taught in `programme`, sorted.
pub fn subjects_for(records: &[StudentRecord], programme: &str) -> Vec<String> {
    records
        .iter()
        .filter(|r| r.programme == programme)
        .map(|r| r.subject())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
