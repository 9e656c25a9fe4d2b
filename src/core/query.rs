//! Purpose: Compute the visible roster view from raw records plus filter state.
//! Exports: `FilterCriteria`, `apply`, `compare_rolls`.
//! Role: Pure function layer; re-run on every roster or criteria change.
//! Invariants: Output is a subsequence of the input ordering-wise stable.
//! Invariants: No side effects; identical inputs yield identical sequences.

use std::cmp::Ordering;

use crate::core::record::{ClassName, Section, StudentRecord};

/// Ephemeral filter state. Created and mutated by the caller, consumed
/// here, never persisted. `None` selectors mean "all".
#[derive(Clone, Debug, Default)]
pub struct FilterCriteria {
    pub search: String,
    pub class: Option<ClassName>,
    pub section: Option<Section>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.class.is_none() && self.section.is_none()
    }
}

/// Filter, search, and sort the roster. Application order: class filter,
/// section filter, free-text search, then a stable sort by roll number.
pub fn apply(roster: &[StudentRecord], criteria: &FilterCriteria) -> Vec<StudentRecord> {
    let needle = criteria.search.trim().to_lowercase();
    let mut view: Vec<StudentRecord> = roster
        .iter()
        .filter(|record| criteria.class.is_none_or(|class| record.class_name == class))
        .filter(|record| {
            criteria
                .section
                .is_none_or(|section| record.section == section)
        })
        .filter(|record| needle.is_empty() || matches_search(record, &needle))
        .cloned()
        .collect();
    view.sort_by(|a, b| compare_rolls(&a.roll_no, &b.roll_no));
    view
}

/// A record matches when ANY of the searchable fields contains the term.
fn matches_search(record: &StudentRecord, needle: &str) -> bool {
    [
        &record.student_id,
        &record.student_name,
        &record.roll_no,
        &record.phone_number,
        &record.father_name,
    ]
    .into_iter()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Numeric comparison when both rolls parse as integers, else string order.
pub fn compare_rolls(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        _ => a.cmp(b),
    }
}
