pub const DEFAULT_RUBRIC: &str = "Evaluate correctness and completeness.";
pub const NO_INPUT: &str = "(no input)";
pub const NONE: &str = "(none)";

/// Prompt sent when the policy has to produce the answer itself.
pub fn generation_prompt(input: &str) -> &str {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        NO_INPUT
    } else {
        trimmed
    }
}

pub fn system_prompt(rubric: &str) -> String {
    let rubric = if rubric.trim().is_empty() {
        DEFAULT_RUBRIC
    } else {
        rubric
    };
    format!(
        r#"You are an evaluation assistant. Grade the response against the rubric. Reply only with valid JSON in this exact format:
{{"pass": true|false, "reason": "brief explanation"}}

Rules for "reason":
- When failing: state the core issue in one short, factual sentence (e.g. what is wrong or what the correct answer is). Do not preface with "The expected output is incorrect" or rubric-specific wording, just the issue itself.
- When passing: one short sentence (e.g. "Correct." or "Matches expected.").
- Keep the reason consistent and reusable across different rubrics.
- Output the JSON object and nothing else.

Rubric:
{rubric}"#
    )
}

pub fn user_prompt(input: &str, expected_output: &str, candidate: &str) -> String {
    format!(
        "Input: {}\n\nExpected output: {}\n\nActual output to grade: {}\n\n\
         Does the actual output satisfy the expected output according to the rubric? Reply with JSON only.",
        or_none(input),
        or_none(expected_output),
        or_none(candidate)
    )
}

fn or_none(s: &str) -> &str {
    if s.is_empty() {
        NONE
    } else {
        s
    }
}
