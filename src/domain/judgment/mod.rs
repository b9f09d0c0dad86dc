//! Strict parsing of structured judgment output
//!
//! The planner and evaluator ask the model for a JSON object conforming
//! to a fixed schema per call site. The whole reply must deserialize
//! against that schema; anything else is a `MalformedJudgment`, which
//! callers recover from with a conservative default. There is no
//! scanning for `{...}` inside free-form text.

use serde::de::DeserializeOwned;

use crate::domain::DomainError;

/// How much of an unparseable reply to keep in the error message
const SNIPPET_LENGTH: usize = 200;

/// Parse a judgment reply against the schema type `T`
///
/// Tolerates a markdown code fence around the JSON, since chat models
/// add one even when told not to. Everything else is strict: trailing
/// prose, partial objects, or missing required fields all fail.
pub fn parse_judgment<T: DeserializeOwned>(raw: &str) -> Result<T, DomainError> {
    let body = strip_code_fence(raw.trim());

    serde_json::from_str(body).map_err(|e| {
        DomainError::malformed_judgment(format!("{} in reply: {}", e, snippet(raw)))
    })
}

/// Remove a surrounding markdown code fence, if present
fn strip_code_fence(body: &str) -> &str {
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };

    // Drop the info string ("json", "JSON", or empty) on the fence line
    let rest = match rest.split_once('\n') {
        Some((_, after)) => after,
        None => return body,
    };

    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn snippet(raw: &str) -> String {
    let trimmed = raw.trim();

    if trimmed.len() <= SNIPPET_LENGTH {
        trimmed.to_string()
    } else {
        let mut end = SNIPPET_LENGTH;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &trimmed[..end])
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct TestJudgment {
        score: u8,
        reasoning: String,
    }

    #[test]
    fn test_plain_json() {
        let parsed: TestJudgment =
            parse_judgment(r#"{"score": 7, "reasoning": "covers the question"}"#).unwrap();

        assert_eq!(parsed.score, 7);
        assert_eq!(parsed.reasoning, "covers the question");
    }

    #[test]
    fn test_fenced_json() {
        let raw = "```json\n{\"score\": 3, \"reasoning\": \"partial\"}\n```";
        let parsed: TestJudgment = parse_judgment(raw).unwrap();

        assert_eq!(parsed.score, 3);
    }

    #[test]
    fn test_fence_without_language() {
        let raw = "```\n{\"score\": 5, \"reasoning\": \"ok\"}\n```";
        let parsed: TestJudgment = parse_judgment(raw).unwrap();

        assert_eq!(parsed.score, 5);
    }

    #[test]
    fn test_free_text_rejected() {
        let result: Result<TestJudgment, _> =
            parse_judgment("The evidence looks sufficient to me.");

        assert!(matches!(result, Err(DomainError::MalformedJudgment { .. })));
    }

    #[test]
    fn test_json_with_trailing_prose_rejected() {
        let raw = r#"{"score": 7, "reasoning": "fine"} Hope that helps!"#;
        let result: Result<TestJudgment, _> = parse_judgment(raw);

        assert!(matches!(result, Err(DomainError::MalformedJudgment { .. })));
    }

    #[test]
    fn test_missing_field_rejected() {
        let result: Result<TestJudgment, _> = parse_judgment(r#"{"score": 7}"#);

        assert!(matches!(result, Err(DomainError::MalformedJudgment { .. })));
    }

    #[test]
    fn test_long_reply_truncated_in_error() {
        let raw = "x".repeat(500);
        let result: Result<TestJudgment, _> = parse_judgment(&raw);

        let message = result.unwrap_err().to_string();
        assert!(message.contains("..."));
        assert!(message.len() < 400);
    }
}
