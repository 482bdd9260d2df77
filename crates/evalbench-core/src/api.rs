//! Request/response boundary for callers outside the core.
//!
//! Each operation answers with a status code and a JSON body, so a transport
//! (stdio lines, HTTP) only has to frame them.

use crate::errors::{GenerationError, PersistenceError};
use crate::judge::GradingPolicy;
use crate::model::{AppState, GradeRequest};
use crate::storage::StateGateway;
use crate::workbench::{Workbench, WorkbenchError};
use serde::Deserialize;
use serde_json::{json, Value};

pub const LOAD_FAILED: &str = "Failed to load data";
pub const SAVE_FAILED: &str = "Failed to save data";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Grades one request. Generation failures come back as status 500 with the
/// same `{pass, reason}` shape as a verdict.
pub async fn grade(policy: &GradingPolicy, body: &Value) -> ApiResponse {
    let req: GradeRequest = match serde_json::from_value(body.clone()) {
        Ok(req) => req,
        Err(e) => {
            return ApiResponse {
                status: 500,
                body: json!({ "pass": false, "reason": format!("invalid grade request: {e}") }),
            }
        }
    };

    let outcome = policy.grade(&req).await;
    let status = if outcome.failed { 500 } else { 200 };
    let body = if outcome.failed {
        json!({ "pass": false, "reason": outcome.verdict.reason })
    } else {
        serde_json::to_value(&outcome.verdict).unwrap_or_else(|_| json!({}))
    };
    ApiResponse { status, body }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateBody {
    #[serde(default)]
    input: Option<String>,
}

/// Raw generation without grading: `{output}` on success, 503 when no
/// generator is configured.
pub async fn generate(policy: &GradingPolicy, body: &Value) -> ApiResponse {
    let input = serde_json::from_value::<GenerateBody>(body.clone())
        .ok()
        .and_then(|b| b.input)
        .unwrap_or_default();

    match policy.generate(&input).await {
        Ok(text) => ApiResponse::ok(json!({ "output": text })),
        Err(GenerationError::NotConfigured { var }) => {
            ApiResponse::error(503, format!("{var} is not configured"))
        }
        Err(e) => {
            tracing::error!(event = "generate_failed", error = %e);
            let msg = e.to_string();
            ApiResponse::error(500, if msg.is_empty() { "Generation failed".into() } else { msg })
        }
    }
}

pub fn load_data(gateway: &dyn StateGateway) -> ApiResponse {
    match gateway.load() {
        Ok(state) => match serde_json::to_value(&state) {
            Ok(body) => ApiResponse::ok(body),
            Err(e) => {
                tracing::error!(event = "load_failed", error = %e);
                ApiResponse::error(500, LOAD_FAILED)
            }
        },
        Err(e) => {
            tracing::error!(event = "load_failed", error = %e);
            ApiResponse::error(500, LOAD_FAILED)
        }
    }
}

/// Replaces the stored state with the body. Missing collections count as
/// empty. 503 when persistence is not configured.
pub fn save_data(workbench: &Workbench, body: &Value) -> ApiResponse {
    let state: AppState = match serde_json::from_value(body.clone()) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(event = "save_failed", error = %e);
            return ApiResponse::error(500, SAVE_FAILED);
        }
    };

    match workbench.replace_state(state) {
        Ok(()) => ApiResponse::ok(json!({ "ok": true })),
        Err(WorkbenchError::Persistence(e @ PersistenceError::NotConfigured)) => {
            ApiResponse::error(503, e.to_string())
        }
        Err(e) => {
            tracing::error!(event = "save_failed", error = %e);
            ApiResponse::error(500, SAVE_FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Store, Unconfigured};
    use std::sync::Arc;

    #[tokio::test]
    async fn mock_grade_is_200() {
        let resp = grade(
            &GradingPolicy::mock(),
            &json!({"input": "What is 2+2?", "expected_output": "4", "rubric": ""}),
        )
        .await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["pass"], true);
        assert!(resp.body.get("generated_output").is_none());
    }

    #[tokio::test]
    async fn malformed_grade_body_is_500_verdict() {
        let resp = grade(&GradingPolicy::mock(), &json!("nope")).await;
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body["pass"], false);
    }

    #[tokio::test]
    async fn generate_without_generator_is_503() {
        let resp = generate(&GradingPolicy::mock(), &json!({"input": "hi"})).await;
        assert_eq!(resp.status, 503);
        assert_eq!(resp.body["error"], "OPENROUTER_API_KEY is not configured");
    }

    #[test]
    fn save_without_database_is_503() {
        let wb = Workbench::open(Arc::new(Unconfigured));
        let resp = save_data(&wb, &json!({}));
        assert_eq!(resp.status, 503);
        assert!(wb.state().is_empty());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let store = Arc::new(Store::memory().unwrap());
        let wb = Workbench::open(store.clone());
        let body = json!({
            "datasets": [{"id": "d1", "name": "D", "testCases": [
                {"id": "t1", "input": "q", "expected_output": "a"}
            ]}],
            "graders": [{"id": "g1", "name": "G", "description": "", "rubric": "r"}],
            "results": [{"testCaseId": "t1", "graderId": "g1", "pass": true, "reason": "ok"}]
        });
        assert_eq!(save_data(&wb, &body).status, 200);

        let loaded = load_data(store.as_ref());
        assert_eq!(loaded.status, 200);
        assert_eq!(loaded.body["results"][0]["reason"], "ok");
        assert_eq!(loaded.body["datasets"][0]["testCases"][0]["id"], "t1");
    }

    #[test]
    fn save_with_dangling_result_is_500() {
        let wb = Workbench::open(Arc::new(Store::memory().unwrap()));
        let body = json!({
            "results": [{"testCaseId": "t9", "graderId": "g9", "pass": true, "reason": ""}]
        });
        let resp = save_data(&wb, &body);
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body["error"], SAVE_FAILED);
    }
}
