//! CSV export of a dataset's results for a set of graders.
//!
//! Columns: `input`, `expected_output`, then `<grader>_pass`,
//! `<grader>_reason`, `<grader>_generated` per grader. Rows are separated by
//! CRLF. A pair without a result exports as `fail` with empty reason.

use crate::model::{Dataset, ExperimentResult, Grader};
use std::collections::HashMap;

pub fn export_csv(dataset: &Dataset, graders: &[Grader], results: &[ExperimentResult]) -> String {
    let by_pair: HashMap<(&str, &str), &ExperimentResult> =
        results.iter().map(|r| (r.key(), r)).collect();

    let mut header = vec![escape_csv("input"), escape_csv("expected_output")];
    for g in graders {
        header.push(escape_csv(&format!("{}_pass", g.name)));
        header.push(escape_csv(&format!("{}_reason", g.name)));
        header.push(escape_csv(&format!("{}_generated", g.name)));
    }

    let mut lines = vec![header.join(",")];
    for tc in &dataset.test_cases {
        let mut row = vec![escape_csv(&tc.input), escape_csv(&tc.expected_output)];
        for g in graders {
            let r = by_pair.get(&(tc.id.as_str(), g.id.as_str()));
            let pass = if r.map(|r| r.pass).unwrap_or(false) {
                "pass"
            } else {
                "fail"
            };
            row.push(escape_csv(pass));
            row.push(escape_csv(r.map(|r| r.reason.as_str()).unwrap_or("")));
            row.push(escape_csv(
                r.and_then(|r| r.generated_output.as_deref()).unwrap_or(""),
            ));
        }
        lines.push(row.join(","));
    }
    lines.join("\r\n")
}

/// Quotes a field containing a comma, quote or line break; inner quotes are
/// doubled.
pub fn escape_csv(s: &str) -> String {
    let t = s.replace('"', "\"\"");
    if t.contains([',', '"', '\n', '\r']) {
        format!("\"{t}\"")
    } else {
        t
    }
}
