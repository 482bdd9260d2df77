use crate::engine::RunReport;
use crate::model::{Dataset, Grader};

pub fn print_summary(report: &RunReport, dataset: &Dataset, graders: &[Grader]) {
    for r in report.results.iter().filter(|r| !r.pass) {
        let input = dataset
            .test_case(&r.test_case_id)
            .map(|tc| tc.input.as_str())
            .unwrap_or("");
        eprintln!(
            "FAIL [{} / {}]: {} ({})",
            grader_name(graders, &r.grader_id),
            r.test_case_id,
            r.reason,
            one_line(input, 60)
        );
    }
    for f in &report.failed_pairs {
        eprintln!(
            "ERROR [{} / {}]: {}",
            grader_name(graders, &f.grader_id),
            f.test_case_id,
            f.reason
        );
    }
    for id in &report.skipped_graders {
        eprintln!("SKIP [{}]: grader not found", id);
    }

    eprintln!(
        "Dataset: {} ({} cases)",
        report.dataset_name,
        dataset.test_cases.len()
    );
    for line in summary_lines(report) {
        eprintln!("{line}");
    }
    eprintln!(
        "Results: recorded={} fail={} error={}",
        report.results.len(),
        report.failures(),
        report.failed_pairs.len()
    );
}

/// `"<name>: <pass>/<total> (<rate>% pass)"` per grader.
pub fn summary_lines(report: &RunReport) -> Vec<String> {
    report
        .stats
        .iter()
        .map(|s| format!("{}: {}/{} ({}% pass)", s.name, s.pass_count, s.total, s.rate()))
        .collect()
}

fn grader_name<'a>(graders: &'a [Grader], id: &'a str) -> &'a str {
    graders
        .iter()
        .find(|g| g.id == id)
        .map(|g| g.name.as_str())
        .unwrap_or(id)
}

fn one_line(s: &str, max: usize) -> String {
    let flat: String = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max).collect();
    format!("{cut}...")
}
