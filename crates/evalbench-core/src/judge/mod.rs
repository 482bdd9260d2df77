use crate::errors::GenerationError;
use crate::model::{GradeRequest, GradeVerdict, LlmResponse};
use crate::providers::llm::LlmClient;
use std::sync::Arc;
use tokio::time::{timeout, Duration};

pub mod prompt;
pub mod verdict;

pub const MOCK_PASS_REASON: &str = "Mock: input and expected output provided.";
pub const MISSING_INPUT_REASON: &str = "Missing or empty input.";
pub const MISSING_EXPECTED_REASON: &str = "Missing or empty expected output.";
pub const UNCLEAR_PREFIX: &str = "AI response unclear. Raw: ";
pub const GENERIC_ERROR_REASON: &str = "Error during grading.";
pub const RAW_ECHO_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub struct GradingConfig {
    /// Upper bound for each generator round trip.
    pub timeout_secs: u64,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeMode {
    /// No generator configured; deterministic presence check.
    Mock,
    Ai,
}

/// What the policy hands back. `failed` marks verdicts synthesized from a
/// generation error so the boundary can report them as such.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeOutcome {
    pub verdict: GradeVerdict,
    pub failed: bool,
}

impl GradeOutcome {
    fn graded(verdict: GradeVerdict) -> Self {
        Self {
            verdict,
            failed: false,
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            verdict: GradeVerdict::new(false, reason),
            failed: true,
        }
    }
}

#[derive(Clone)]
pub struct GradingPolicy {
    config: GradingConfig,
    client: Option<Arc<dyn LlmClient>>,
}

impl GradingPolicy {
    pub fn new(config: GradingConfig, client: Option<Arc<dyn LlmClient>>) -> Self {
        Self { config, client }
    }

    pub fn mock() -> Self {
        Self::new(GradingConfig::default(), None)
    }

    pub fn mode(&self) -> GradeMode {
        if self.client.is_some() {
            GradeMode::Ai
        } else {
            GradeMode::Mock
        }
    }

    /// Grades one request. Always resolves to a verdict; generation errors
    /// become `pass = false` with the error text as reason.
    pub async fn grade(&self, req: &GradeRequest) -> GradeOutcome {
        let Some(client) = self.client.as_ref() else {
            return GradeOutcome::graded(mock_verdict(&req.input, &req.expected_output));
        };

        match self.grade_with(client.as_ref(), req).await {
            Ok(verdict) => GradeOutcome::graded(verdict),
            Err(e) => {
                tracing::warn!(
                    event = "grade_failed",
                    provider = client.provider_name(),
                    status = ?e.status(),
                    error = %e
                );
                let msg = e.to_string();
                GradeOutcome::failed(if msg.trim().is_empty() {
                    GENERIC_ERROR_REASON.to_string()
                } else {
                    msg
                })
            }
        }
    }

    /// Produces a raw answer for `input` without grading it.
    pub async fn generate(&self, input: &str) -> Result<String, GenerationError> {
        let client = self
            .client
            .as_ref()
            .ok_or(GenerationError::NotConfigured {
                var: crate::providers::llm::openrouter::API_KEY_VAR,
            })?;
        let resp = self.call(client.as_ref(), input, None).await?;
        Ok(resp.text)
    }

    async fn grade_with(
        &self,
        client: &dyn LlmClient,
        req: &GradeRequest,
    ) -> Result<GradeVerdict, GenerationError> {
        let generated = match req.actual_output {
            Some(_) => None,
            None => {
                let resp = self
                    .call(client, prompt::generation_prompt(&req.input), None)
                    .await?;
                Some(resp.text.trim().to_string())
            }
        };
        let candidate = req
            .actual_output
            .as_deref()
            .or(generated.as_deref())
            .unwrap_or_default();

        let system = prompt::system_prompt(&req.rubric);
        let user = prompt::user_prompt(&req.input, &req.expected_output, candidate);
        let reply = self.call(client, &user, Some(&system)).await?;

        let mut verdict = verdict_from_reply(&reply.text, req);
        verdict.generated_output = generated;
        Ok(verdict)
    }

    async fn call(
        &self,
        client: &dyn LlmClient,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<LlmResponse, GenerationError> {
        let secs = self.config.timeout_secs;
        timeout(Duration::from_secs(secs), client.complete(prompt, system))
            .await
            .map_err(|_| GenerationError::Timeout { secs })?
    }
}

pub fn mock_pass(input: &str, expected_output: &str) -> bool {
    !input.trim().is_empty() && !expected_output.trim().is_empty()
}

pub fn mock_verdict(input: &str, expected_output: &str) -> GradeVerdict {
    let has_input = !input.trim().is_empty();
    let has_expected = !expected_output.trim().is_empty();
    let reason = if !has_input {
        MISSING_INPUT_REASON
    } else if !has_expected {
        MISSING_EXPECTED_REASON
    } else {
        MOCK_PASS_REASON
    };
    GradeVerdict::new(has_input && has_expected, reason)
}

fn verdict_from_reply(text: &str, req: &GradeRequest) -> GradeVerdict {
    let parsed = verdict::extract(text);
    if let (Some(pass), Some(reason)) = (parsed.pass, parsed.reason.as_deref()) {
        return GradeVerdict::new(pass, reason.trim());
    }

    tracing::info!(
        event = "verdict_unparseable",
        partial_reason = parsed.reason.is_some(),
        reply_chars = text.chars().count()
    );
    let reason = parsed
        .reason
        .unwrap_or_else(|| format!("{UNCLEAR_PREFIX}{}", truncate_chars(text, RAW_ECHO_CHARS)));
    GradeVerdict::new(mock_pass(&req.input, &req.expected_output), reason)
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_reasons() {
        assert_eq!(
            mock_verdict("What is 2+2?", "4"),
            GradeVerdict::new(true, MOCK_PASS_REASON)
        );
        assert_eq!(
            mock_verdict("  ", "4"),
            GradeVerdict::new(false, MISSING_INPUT_REASON)
        );
        assert_eq!(
            mock_verdict("", ""),
            GradeVerdict::new(false, MISSING_INPUT_REASON)
        );
        assert_eq!(
            mock_verdict("What is 2+2?", "\n"),
            GradeVerdict::new(false, MISSING_EXPECTED_REASON)
        );
    }

    #[test]
    fn truncation_is_char_safe() {
        let s = "é".repeat(300);
        let t = truncate_chars(&s, RAW_ECHO_CHARS);
        assert_eq!(t.chars().count(), RAW_ECHO_CHARS);
        assert_eq!(truncate_chars("short", RAW_ECHO_CHARS), "short");
    }

    #[test]
    fn parsed_reason_is_trimmed() {
        let req = GradeRequest {
            input: "q".into(),
            expected_output: "a".into(),
            ..Default::default()
        };
        let v = verdict_from_reply(r#"{"pass": true, "reason": "  Correct.  "}"#, &req);
        assert_eq!(v, GradeVerdict::new(true, "Correct."));
    }

    #[test]
    fn fallback_keeps_partial_reason() {
        let req = GradeRequest {
            input: "q".into(),
            expected_output: "".into(),
            ..Default::default()
        };
        let v = verdict_from_reply(r#"{"pass": "maybe", "reason": "unsure"}"#, &req);
        assert_eq!(v, GradeVerdict::new(false, "unsure"));
    }
}
