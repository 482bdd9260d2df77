use serde::{Deserialize, Deserializer, Serialize};

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// Single test case: input plus expected answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub expected_output: String,
}

/// Grader definition. `rubric` is passed verbatim into the grading prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grader {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rubric: String,
}

/// Named, ordered collection of test cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    #[serde(rename = "testCases", default)]
    pub test_cases: Vec<TestCase>,
}

impl Dataset {
    pub fn test_case(&self, id: &str) -> Option<&TestCase> {
        self.test_cases.iter().find(|tc| tc.id == id)
    }
}

/// Request accepted by the grading policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub input: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub expected_output: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rubric: String,
    #[serde(rename = "graderName", default, skip_serializing_if = "Option::is_none")]
    pub grader_name: Option<String>,
    /// When present the policy grades this text instead of generating one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_output: Option<String>,
}

/// Verdict returned by the grading policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeVerdict {
    pub pass: bool,
    pub reason: String,
    /// Set only when the policy generated the graded answer itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_output: Option<String>,
}

impl GradeVerdict {
    pub fn new(pass: bool, reason: impl Into<String>) -> Self {
        Self {
            pass,
            reason: reason.into(),
            generated_output: None,
        }
    }
}

/// Stored verdict for one (test case, grader) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentResult {
    #[serde(rename = "testCaseId")]
    pub test_case_id: String,
    #[serde(rename = "graderId")]
    pub grader_id: String,
    pub pass: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_output: Option<String>,
}

impl ExperimentResult {
    pub fn from_verdict(test_case_id: &str, grader_id: &str, verdict: GradeVerdict) -> Self {
        Self {
            test_case_id: test_case_id.to_string(),
            grader_id: grader_id.to_string(),
            pass: verdict.pass,
            reason: verdict.reason,
            generated_output: verdict.generated_output,
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.test_case_id, &self.grader_id)
    }
}

/// Full application state; the unit of load/save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub datasets: Vec<Dataset>,
    #[serde(default)]
    pub graders: Vec<Grader>,
    #[serde(default)]
    pub results: Vec<ExperimentResult>,
}

impl AppState {
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty() && self.graders.is_empty() && self.results.is_empty()
    }

    pub fn dataset(&self, id: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id == id)
    }

    pub fn grader(&self, id: &str) -> Option<&Grader> {
        self.graders.iter().find(|g| g.id == id)
    }

    pub fn result(&self, test_case_id: &str, grader_id: &str) -> Option<&ExperimentResult> {
        self.results
            .iter()
            .find(|r| r.test_case_id == test_case_id && r.grader_id == grader_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_data_contract() {
        let state = AppState {
            datasets: vec![Dataset {
                id: "d1".into(),
                name: "Math facts".into(),
                test_cases: vec![TestCase {
                    id: "t1".into(),
                    input: "What is 2+2?".into(),
                    expected_output: "4".into(),
                }],
            }],
            graders: vec![],
            results: vec![ExperimentResult {
                test_case_id: "t1".into(),
                grader_id: "g1".into(),
                pass: true,
                reason: "Correct.".into(),
                generated_output: None,
            }],
        };
        let v = serde_json::to_value(&state).unwrap();
        assert_eq!(v["datasets"][0]["testCases"][0]["expected_output"], "4");
        assert_eq!(v["results"][0]["testCaseId"], "t1");
        assert_eq!(v["results"][0]["graderId"], "g1");
        assert!(v["results"][0].get("generated_output").is_none());
    }

    #[test]
    fn grade_request_accepts_missing_fields() {
        let req: GradeRequest = serde_json::from_str(r#"{"input": "hi"}"#).unwrap();
        assert_eq!(req.input, "hi");
        assert_eq!(req.expected_output, "");
        assert!(req.actual_output.is_none());

        let req: GradeRequest =
            serde_json::from_str(r#"{"input": null, "expected_output": "4"}"#).unwrap();
        assert_eq!(req.input, "");
    }
}
