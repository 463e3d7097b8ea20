//! Cleanup and parsing of generative model output.
//!
//! Models are told to answer with bare JSON but regularly wrap it in markdown
//! fences anyway. Fence removal handles:
//! - an opening fence with or without a language tag (```` ```json ````, ```` ```JSON ````)
//! - the payload on the same line as the opening fence
//! - prose before the first fence or after the last one
//! - fences nested inside fences, peeled one layer at a time
//!
//! Text that already starts with `{` or `[` is only trimmed, so backticks
//! inside JSON strings are never touched.

use crate::models::{MatchResult, SchemeMatches};
use serde_json::Value;
use thiserror::Error;

const FENCE: &str = "```";

/// Model output that is not the expected JSON after cleanup
#[derive(Debug, Clone, Error)]
#[error("model returned malformed JSON: {reason}")]
pub struct MalformedOutput {
    pub reason: String,
    pub raw: String,
}

/// Remove markdown code fences around a payload and trim it
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if !text.starts_with(FENCE) {
        if looks_like_json(text) {
            return text;
        }
        match text.find(FENCE) {
            Some(start) => text = &text[start..],
            None => return text,
        }
    }

    while let Some(rest) = text.strip_prefix(FENCE) {
        let body = strip_language_tag(rest);
        let body = match body.rfind(FENCE) {
            Some(end) => &body[..end],
            None => body,
        };
        text = body.trim();
    }

    text
}

fn looks_like_json(text: &str) -> bool {
    text.starts_with('{') || text.starts_with('[')
}

/// Skip an info string such as `json` directly after an opening fence
fn strip_language_tag(after_fence: &str) -> &str {
    let tag_len = after_fence
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')))
        .unwrap_or(after_fence.len());
    let rest = &after_fence[tag_len..];

    // A bare word followed by a closing fence is content, not a tag
    if tag_len > 0 && !(rest.starts_with(char::is_whitespace) || looks_like_json(rest)) {
        return after_fence;
    }
    rest
}

/// Clean raw model text and parse it into scheme matches.
///
/// Accepts `{"schemes": [...]}` (a null or missing list becomes empty) or a bare
/// array of schemes. Anything else is reported with the raw text attached.
pub fn parse_model_output(raw: &str) -> Result<SchemeMatches, MalformedOutput> {
    let cleaned = strip_code_fences(raw);

    let malformed = |reason: String| MalformedOutput {
        reason,
        raw: raw.to_string(),
    };

    let value: Value = serde_json::from_str(cleaned).map_err(|e| malformed(e.to_string()))?;

    match value {
        Value::Object(_) => serde_json::from_value(value).map_err(|e| malformed(e.to_string())),
        Value::Array(_) => serde_json::from_value::<Vec<MatchResult>>(value)
            .map(|schemes| SchemeMatches { schemes })
            .map_err(|e| malformed(e.to_string())),
        other => Err(malformed(format!(
            "expected a JSON object with a \"schemes\" list, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{"schemes": [{"schemeName": "SNAP", "summary": "Food aid", "eligibilityReason": "Low income", "steps": ["Apply online"], "documents": ["ID"]}]}"#;

    #[test]
    fn test_plain_json_is_untouched() {
        assert_eq!(strip_code_fences(&format!("  {}\n", PAYLOAD)), PAYLOAD);
    }

    #[test]
    fn test_fence_with_language_tag() {
        let raw = format!("```json\n{}\n```", PAYLOAD);
        assert_eq!(strip_code_fences(&raw), PAYLOAD);

        let raw = format!("```JSON\r\n{}\r\n```\n", PAYLOAD);
        assert_eq!(strip_code_fences(&raw), PAYLOAD);
    }

    #[test]
    fn test_fence_without_tag_and_same_line_payload() {
        assert_eq!(strip_code_fences(&format!("```\n{}\n```", PAYLOAD)), PAYLOAD);
        assert_eq!(strip_code_fences(&format!("```json{}```", PAYLOAD)), PAYLOAD);
    }

    #[test]
    fn test_prose_around_fences() {
        let raw = format!("Here are the schemes:\n```json\n{}\n```\nLet me know if you need more.", PAYLOAD);
        assert_eq!(strip_code_fences(&raw), PAYLOAD);
    }

    #[test]
    fn test_nested_fences() {
        let raw = format!("```markdown\n```json\n{}\n```\n```", PAYLOAD);
        assert_eq!(strip_code_fences(&raw), PAYLOAD);
    }

    #[test]
    fn test_missing_closing_fence() {
        assert_eq!(strip_code_fences(&format!("```json\n{}", PAYLOAD)), PAYLOAD);
    }

    #[test]
    fn test_backticks_inside_json_strings_survive() {
        let raw = r#"{"schemes": [{"schemeName": "Use ``` carefully", "summary": "", "eligibilityReason": "", "steps": [], "documents": []}]}"#;
        assert_eq!(strip_code_fences(raw), raw);
        let parsed = parse_model_output(raw).unwrap();
        assert_eq!(parsed.schemes[0].scheme_name, "Use ``` carefully");
    }

    #[test]
    fn test_bare_word_is_not_a_language_tag() {
        assert_eq!(strip_code_fences("```true```"), "true");
    }

    #[test]
    fn test_fenced_and_plain_parse_identically() {
        let fenced = parse_model_output(&format!("```json\n{}\n```", PAYLOAD)).unwrap();
        let plain = parse_model_output(PAYLOAD).unwrap();

        assert_eq!(fenced, plain);
        assert_eq!(plain.schemes[0].steps, vec!["Apply online"]);
    }

    #[test]
    fn test_bare_array_is_accepted() {
        let parsed = parse_model_output(r#"[{"schemeName": "WIC"}]"#).unwrap();
        assert_eq!(parsed.schemes.len(), 1);
        assert!(parsed.schemes[0].documents.is_empty());
    }

    #[test]
    fn test_empty_schemes() {
        let parsed = parse_model_output("```json\n{\"schemes\": []}\n```").unwrap();
        assert!(parsed.schemes.is_empty());
    }

    #[test]
    fn test_invalid_json_keeps_raw_text() {
        let raw = "```json\nSorry, I cannot help with that.\n```";
        let err = parse_model_output(raw).unwrap_err();

        assert_eq!(err.raw, raw);
        assert!(err.to_string().starts_with("model returned malformed JSON"));
    }

    #[test]
    fn test_scalar_json_is_rejected() {
        let err = parse_model_output("\"schemes\"").unwrap_err();
        assert!(err.reason.contains("a string"));
    }
}
