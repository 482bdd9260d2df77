use crate::judge::GradingPolicy;
use crate::model::{ExperimentResult, GradeRequest, Grader};
use crate::workbench::{Workbench, WorkbenchError};
use serde::Serialize;

/// One pair the policy could not grade. Not recorded as a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPair {
    pub test_case_id: String,
    pub grader_id: String,
    pub reason: String,
}

/// Pass rate of one grader over the results of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraderStats {
    pub grader_id: String,
    pub name: String,
    pub pass_count: usize,
    pub total: usize,
}

impl GraderStats {
    /// Percentage with one decimal, `"0"` when nothing was graded.
    pub fn rate(&self) -> String {
        if self.total == 0 {
            return "0".to_string();
        }
        format!("{:.1}", self.pass_count as f64 * 100.0 / self.total as f64)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dataset_id: String,
    pub dataset_name: String,
    /// Graders that were actually run, in request order.
    pub grader_ids: Vec<String>,
    pub skipped_graders: Vec<String>,
    pub results: Vec<ExperimentResult>,
    pub failed_pairs: Vec<FailedPair>,
    pub stats: Vec<GraderStats>,
    pub started_at: String,
    pub finished_at: String,
}

impl RunReport {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.pass).count()
    }
}

pub struct Runner {
    pub policy: GradingPolicy,
}

impl Runner {
    pub fn new(policy: GradingPolicy) -> Self {
        Self { policy }
    }

    /// Grades every (test case, grader) pair sequentially, then reconciles
    /// the recorded results into the workbench in one save.
    pub async fn run(
        &self,
        workbench: &Workbench,
        dataset_id: &str,
        grader_ids: &[String],
    ) -> Result<RunReport, WorkbenchError> {
        let started_at = chrono::Utc::now().to_rfc3339();
        let dataset = workbench
            .dataset(dataset_id)
            .ok_or_else(|| WorkbenchError::DatasetNotFound(dataset_id.to_string()))?;

        let mut graders: Vec<Grader> = Vec::new();
        let mut skipped_graders = Vec::new();
        for id in grader_ids {
            if graders.iter().any(|g| &g.id == id) {
                continue;
            }
            match workbench.grader(id) {
                Some(g) => graders.push(g),
                None => {
                    tracing::warn!(event = "grader_skipped", grader_id = %id);
                    skipped_graders.push(id.clone());
                }
            }
        }

        tracing::info!(
            event = "run_started",
            dataset_id = %dataset.id,
            test_cases = dataset.test_cases.len(),
            graders = graders.len(),
            mode = ?self.policy.mode()
        );

        let mut results = Vec::new();
        let mut failed_pairs = Vec::new();
        for tc in &dataset.test_cases {
            for g in &graders {
                let req = GradeRequest {
                    input: tc.input.clone(),
                    expected_output: tc.expected_output.clone(),
                    rubric: g.rubric.clone(),
                    grader_name: Some(g.name.clone()),
                    actual_output: None,
                };
                let outcome = self.policy.grade(&req).await;
                if outcome.failed {
                    tracing::warn!(
                        event = "pair_failed",
                        test_case_id = %tc.id,
                        grader_id = %g.id,
                        reason = %outcome.verdict.reason
                    );
                    failed_pairs.push(FailedPair {
                        test_case_id: tc.id.clone(),
                        grader_id: g.id.clone(),
                        reason: outcome.verdict.reason,
                    });
                    continue;
                }
                results.push(ExperimentResult::from_verdict(&tc.id, &g.id, outcome.verdict));
            }
        }

        workbench.merge_results(&results)?;

        let stats = graders
            .iter()
            .map(|g| {
                let mine = results.iter().filter(|r| r.grader_id == g.id);
                let (pass_count, total) =
                    mine.fold((0, 0), |(p, t), r| (p + usize::from(r.pass), t + 1));
                GraderStats {
                    grader_id: g.id.clone(),
                    name: g.name.clone(),
                    pass_count,
                    total,
                }
            })
            .collect();

        tracing::info!(
            event = "run_finished",
            dataset_id = %dataset.id,
            recorded = results.len(),
            failed_pairs = failed_pairs.len()
        );

        Ok(RunReport {
            dataset_id: dataset.id,
            dataset_name: dataset.name,
            grader_ids: graders.into_iter().map(|g| g.id).collect(),
            skipped_graders,
            results,
            failed_pairs,
            stats,
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(pass_count: usize, total: usize) -> GraderStats {
        GraderStats {
            grader_id: "g".into(),
            name: "G".into(),
            pass_count,
            total,
        }
    }

    #[test]
    fn rate_has_one_decimal() {
        assert_eq!(stats(0, 0).rate(), "0");
        assert_eq!(stats(1, 3).rate(), "33.3");
        assert_eq!(stats(2, 2).rate(), "100.0");
        assert_eq!(stats(0, 4).rate(), "0.0");
    }
}
