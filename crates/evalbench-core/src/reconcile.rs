//! Merging a run's verdicts into the persisted result set.
//!
//! A pair's result is replaced in place, new pairs are appended in batch
//! order, and pairs the batch does not mention are left alone. Merging the
//! same batch twice is a no-op the second time.

use crate::model::ExperimentResult;
use std::collections::HashMap;

pub fn merge(existing: &[ExperimentResult], batch: &[ExperimentResult]) -> Vec<ExperimentResult> {
    let mut merged: Vec<ExperimentResult> = existing.to_vec();
    let mut index: HashMap<(String, String), usize> = HashMap::with_capacity(merged.len());
    for (i, r) in merged.iter().enumerate() {
        index
            .entry((r.test_case_id.clone(), r.grader_id.clone()))
            .or_insert(i);
    }

    for r in batch {
        let key = (r.test_case_id.clone(), r.grader_id.clone());
        match index.get(&key) {
            Some(&i) => merged[i] = r.clone(),
            None => {
                index.insert(key, merged.len());
                merged.push(r.clone());
            }
        }
    }

    dedup_keys(merged)
}

/// Keeps the first slot for each key; an existing set that already held
/// duplicates collapses to the slot the merge wrote to.
fn dedup_keys(results: Vec<ExperimentResult>) -> Vec<ExperimentResult> {
    let mut seen = std::collections::HashSet::with_capacity(results.len());
    results
        .into_iter()
        .filter(|r| seen.insert((r.test_case_id.clone(), r.grader_id.clone())))
        .collect()
}

/// Drops every result whose pair matches `pred`.
pub fn remove_where<F>(results: &[ExperimentResult], pred: F) -> Vec<ExperimentResult>
where
    F: Fn(&ExperimentResult) -> bool,
{
    results.iter().filter(|r| !pred(r)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(tc: &str, g: &str, pass: bool, reason: &str) -> ExperimentResult {
        ExperimentResult {
            test_case_id: tc.into(),
            grader_id: g.into(),
            pass,
            reason: reason.into(),
            generated_output: None,
        }
    }

    #[test]
    fn replaces_in_place_and_appends() {
        let existing = vec![r("t1", "g1", false, "old"), r("t2", "g1", true, "keep")];
        let batch = vec![r("t3", "g1", true, "new"), r("t1", "g1", true, "fresh")];
        let merged = merge(&existing, &batch);
        assert_eq!(
            merged,
            vec![
                r("t1", "g1", true, "fresh"),
                r("t2", "g1", true, "keep"),
                r("t3", "g1", true, "new"),
            ]
        );
    }

    #[test]
    fn idempotent() {
        let existing = vec![r("t1", "g1", false, "a"), r("t2", "g2", true, "b")];
        let batch = vec![r("t1", "g1", true, "c"), r("t9", "g2", false, "d")];
        let once = merge(&existing, &batch);
        let twice = merge(&once, &batch);
        assert_eq!(once, twice);
    }

    #[test]
    fn preserves_untouched_pairs() {
        let existing = vec![
            r("t1", "g1", true, "a"),
            r("t1", "g2", false, "b"),
            r("t2", "g1", true, "c"),
        ];
        let batch = vec![r("t1", "g1", false, "z")];
        let merged = merge(&existing, &batch);
        assert_eq!(merged[1], existing[1]);
        assert_eq!(merged[2], existing[2]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn last_occurrence_in_batch_wins() {
        let batch = vec![r("t1", "g1", false, "first"), r("t1", "g1", true, "second")];
        let merged = merge(&[], &batch);
        assert_eq!(merged, vec![r("t1", "g1", true, "second")]);
    }

    #[test]
    fn empty_batch_is_identity() {
        let existing = vec![r("t1", "g1", true, "a")];
        assert_eq!(merge(&existing, &[]), existing);
    }

    #[test]
    fn remove_where_filters_by_pair() {
        let existing = vec![r("t1", "g1", true, "a"), r("t2", "g1", true, "b")];
        let left = remove_where(&existing, |x| x.test_case_id == "t1");
        assert_eq!(left, vec![r("t2", "g1", true, "b")]);
    }
}
