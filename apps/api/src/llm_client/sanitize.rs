//! Response Sanitizer: isolates a single JSON object from free-form model output.
//!
//! Best-effort and lossy: no brace balancing is attempted. Output holding several top-level
//! objects, or a stray `}` after the object, yields a slice that fails to parse downstream.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;

const FENCE: &str = "```";

static FENCED_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(.*?)```").expect("fenced block pattern is valid"));

/// Returns the substring most likely to be a JSON object, or the trimmed text when no
/// `{ … }` span is present.
///
/// Fenced blocks tagged `json` (or whose body opens with `{`) are unwrapped; every other
/// fenced block is deleted with its content so example text never leaks into the object.
pub fn sanitize_json_output(raw: &str) -> String {
    let unfenced = FENCED_BLOCK_RE.replace_all(raw, |caps: &Captures| {
        let inner = caps.get(1).map_or("", |m| m.as_str());
        fenced_json_body(inner).to_string()
    });
    let cleaned = unfenced.replace(FENCE, "");
    let cleaned = cleaned.trim();

    match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(first), Some(last)) if first < last => cleaned[first..=last].to_string(),
        _ => cleaned.to_string(),
    }
}

/// Sanitizes, then deserializes.
pub fn parse_json_output<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(&sanitize_json_output(raw))
}

fn fenced_json_body(inner: &str) -> &str {
    let trimmed = inner.trim_start();
    if trimmed.starts_with('{') {
        return inner;
    }
    // Single-line fence with the tag glued to the object: ```json{...}```
    if let Some(rest) = trimmed
        .get(..4)
        .filter(|tag| tag.eq_ignore_ascii_case("json"))
        .map(|_| &trimmed[4..])
    {
        if rest.trim_start().starts_with('{') {
            return rest;
        }
    }
    let (info, body) = inner.split_once('\n').unwrap_or((inner, ""));
    if info.trim().eq_ignore_ascii_case("json") || body.trim_start().starts_with('{') {
        body
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_plain_object_is_unchanged() {
        let input = r#"{"original": "a", "updated": "b"}"#;
        assert_eq!(sanitize_json_output(input), input);
    }

    #[test]
    fn test_json_fence_is_unwrapped() {
        let input = "```json\n{\"ats_score\": 72}\n```";
        assert_eq!(sanitize_json_output(input), "{\"ats_score\": 72}");
    }

    #[test]
    fn test_untagged_fence_with_object_is_unwrapped() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(sanitize_json_output(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_single_line_fence_is_unwrapped() {
        let input = "```{\"key\": 1}```";
        assert_eq!(sanitize_json_output(input), "{\"key\": 1}");
    }

    #[test]
    fn test_single_line_tagged_fence_is_unwrapped() {
        let raw = "Result: ```json{\"a\": 1}``` done";
        assert_eq!(sanitize_json_output(raw), r#"{"a": 1}"#);

        let spaced = "```JSON {\"a\": 1}```";
        assert_eq!(sanitize_json_output(spaced), r#"{"a": 1}"#);
    }

    #[test]
    fn test_leading_and_trailing_prose_is_dropped() {
        let input = "Sure! Here is the evaluation:\n{\"ats_score\": 64}\nLet me know if you need more.";
        assert_eq!(sanitize_json_output(input), "{\"ats_score\": 64}");
    }

    #[test]
    fn test_non_json_fence_content_is_deleted() {
        let input = "```text\nKeyword Match {40%} and Skills {20%}\n```\n{\"ats_score\": 55}";
        assert_eq!(sanitize_json_output(input), "{\"ats_score\": 55}");
    }

    #[test]
    fn test_nested_braces_in_string_values_survive() {
        let input = r#"Result: {"match_summary": "Uses {placeholders} in {templates}", "ats_score": 80} done"#;
        let parsed: Value = parse_json_output(input).unwrap();
        assert_eq!(parsed["match_summary"], "Uses {placeholders} in {templates}");
    }

    #[test]
    fn test_nested_objects_are_kept_whole() {
        let input = "prefix {\"outer\": {\"inner\": [1, 2]}} suffix";
        assert_eq!(sanitize_json_output(input), "{\"outer\": {\"inner\": [1, 2]}}");
    }

    #[test]
    fn test_no_braces_returns_trimmed_text() {
        assert_eq!(
            sanitize_json_output("  I cannot evaluate this resume.  \n"),
            "I cannot evaluate this resume."
        );
    }

    #[test]
    fn test_unpaired_fence_marker_is_removed() {
        let input = "```json\n{\"updated\": \"x\"}";
        assert_eq!(sanitize_json_output(input), "{\"updated\": \"x\"}");
    }

    #[test]
    fn test_two_objects_yield_unparseable_slice() {
        let input = r#"{"a": 1} and also {"b": 2}"#;
        assert_eq!(sanitize_json_output(input), input);
        assert!(parse_json_output::<Value>(input).is_err());
    }

    #[test]
    fn test_stray_closing_brace_after_object_fails_cleanly() {
        let input = r#"{"updated": "Led migration"} (note: ignore this })"#;
        assert!(parse_json_output::<Value>(input).is_err());
    }

    #[test]
    fn test_sanitizer_is_idempotent() {
        let inputs = [
            "```json\n{\"a\": 1}\n```",
            "noise {\"a\": {\"b\": \"}\"}} noise",
            "   no json here   ",
            "```python\nprint('x')\n``` then {\"ok\": true}",
            "} backwards {",
            "",
            "```json\n{\"a\": \"```\"}",
        ];
        for input in inputs {
            let once = sanitize_json_output(input);
            assert_eq!(sanitize_json_output(&once), once, "input: {input:?}");
        }
    }
}
