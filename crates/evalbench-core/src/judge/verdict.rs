//! Recovering a `{pass, reason}` verdict from free-form model text.
//!
//! Models reliably wrap the verdict in prose or code fences and regularly
//! emit unescaped quotes inside `reason`. Parsing is two-tier: strict JSON on
//! the outermost brace span, then per-field extraction. Nothing here errors.

use regex::Regex;
use std::sync::OnceLock;

/// A complete verdict: both fields were established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub pass: bool,
    pub reason: String,
}

/// Whatever could be recovered, possibly only one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedVerdict {
    pub pass: Option<bool>,
    pub reason: Option<String>,
}

impl ParsedVerdict {
    pub fn complete(self) -> Option<Verdict> {
        match (self.pass, self.reason) {
            (Some(pass), Some(reason)) => Some(Verdict { pass, reason }),
            _ => None,
        }
    }
}

fn object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").unwrap())
}

fn pass_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""pass"\s*:\s*(true|false)"#).unwrap())
}

fn reason_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Body ends at the first quote followed by another key or a closing
    // brace. Interior quotes the model forgot to escape stay in the capture.
    RE.get_or_init(|| {
        Regex::new(r#"(?s)"reason"\s*:\s*"(.*?)"\s*(?:,\s*"[A-Za-z_]+"\s*:|\})"#).unwrap()
    })
}

/// Returns the verdict when both `pass` and `reason` can be recovered.
pub fn parse_verdict(text: &str) -> Option<Verdict> {
    extract(text).complete()
}

/// Best-effort extraction of the verdict fields.
pub fn extract(text: &str) -> ParsedVerdict {
    let Some(m) = object_re().find(text) else {
        return ParsedVerdict::default();
    };
    let candidate = m.as_str();

    match serde_json::from_str::<serde_json::Value>(candidate) {
        Ok(v) => ParsedVerdict {
            pass: v.get("pass").and_then(|p| p.as_bool()),
            reason: v
                .get("reason")
                .and_then(|r| r.as_str())
                .map(str::to_string),
        },
        Err(_) => extract_fields(candidate),
    }
}

fn extract_fields(candidate: &str) -> ParsedVerdict {
    let pass = pass_re()
        .captures(candidate)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str() == "true");
    let reason = reason_re()
        .captures(candidate)
        .and_then(|c| c.get(1))
        .map(|m| unescape(m.as_str()));
    ParsedVerdict { pass, reason }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_object() {
        let v = parse_verdict(r#"{"pass": true, "reason": "ok"}"#).unwrap();
        assert_eq!(
            v,
            Verdict {
                pass: true,
                reason: "ok".into()
            }
        );
    }

    #[test]
    fn object_wrapped_in_prose_and_fences() {
        let text = "Sure! Here is my verdict:\n```json\n{\"pass\": false, \"reason\": \"Wrong sum.\"}\n```\nHope that helps.";
        let v = parse_verdict(text).unwrap();
        assert!(!v.pass);
        assert_eq!(v.reason, "Wrong sum.");
    }

    #[test]
    fn escaped_quotes_recovered() {
        let v = parse_verdict(r#"{"pass": false, "reason": "bad \"quote\" here"}"#).unwrap();
        assert!(!v.pass);
        assert_eq!(v.reason, r#"bad "quote" here"#);
    }

    #[test]
    fn unescaped_quotes_fall_back_to_fields() {
        let text = r#"{"pass": false, "reason": "the model said "five" instead of 4"}"#;
        assert!(serde_json::from_str::<serde_json::Value>(text).is_err());
        let v = parse_verdict(text).unwrap();
        assert!(!v.pass);
        assert_eq!(v.reason, r#"the model said "five" instead of 4"#);
    }

    #[test]
    fn reason_before_pass_with_broken_quotes() {
        let text = r#"{"reason": "says "hi", not hello", "pass": true}"#;
        let v = parse_verdict(text).unwrap();
        assert!(v.pass);
        assert_eq!(v.reason, r#"says "hi", not hello"#);
    }

    #[test]
    fn reason_stops_at_end_of_verdict_object() {
        let text = "{\"pass\": false, \"reason\": \"Said \"5\".\"}\nNext: {\"note\": \"x\"}";
        let parsed = extract(text);
        assert_eq!(parsed.pass, Some(false));
        assert_eq!(parsed.reason.as_deref(), Some(r#"Said "5"."#));
    }

    #[test]
    fn invalid_escape_breaks_strict_but_not_fields() {
        let text = r#"{"pass": true, "reason": "path C:\dir is fine"}"#;
        let v = parse_verdict(text).unwrap();
        assert!(v.pass);
        assert_eq!(v.reason, r#"path C:\dir is fine"#);
    }

    #[test]
    fn no_json_is_none() {
        assert_eq!(parse_verdict("no json here"), None);
        assert_eq!(extract("no json here"), ParsedVerdict::default());
    }

    #[test]
    fn partial_reason_is_kept() {
        let parsed = extract(r#"{"pass": "yes", "reason": "looks right"}"#);
        assert_eq!(parsed.pass, None);
        assert_eq!(parsed.reason.as_deref(), Some("looks right"));
        assert!(parsed.complete().is_none());
    }

    #[test]
    fn pass_without_reason_is_incomplete() {
        assert!(parse_verdict(r#"{"pass": true}"#).is_none());
    }
}
