//! Layered recovery parser for LLM output
//!
//! Model output is supposed to be one JSON object, but in practice arrives
//! wrapped in code fences, surrounded by prose, sprinkled with control
//! characters, or truncated mid-structure. Recovery strategies are attempted
//! in a fixed order; the first success wins and is tagged with the method
//! that produced it. Exhausting every strategy is an expected outcome, not
//! an error to propagate: the caller treats it as a zero-yield batch.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Which recovery strategy produced the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMethod {
    /// Strict parse of the whole input
    Direct,
    /// Contents of a fenced code block
    FencedBlock,
    /// Slice from the first `{` to the last `}`
    Sliced,
    /// Sliced, then control characters and trailing commas removed
    Sanitized,
    /// Sanitized, then unterminated strings/brackets auto-completed
    BracketBalanced,
    /// First parseable top-level `{...}` object found by scanning
    ObjectScan,
}

/// A successful parse, tagged with the strategy that produced it.
#[derive(Debug)]
pub struct ParsedJson {
    /// The recovered JSON value (an object or an array)
    pub value: Value,
    /// The strategy that succeeded
    pub method: ParseMethod,
}

/// All recovery strategies failed.
#[derive(Debug)]
pub struct ParseFailure {
    /// Why the input was rejected
    pub reason: String,
    /// The first part of the offending input, for logging
    pub preview: String,
}

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap());

static TRAILING_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",(\s*[}\]])").unwrap());

fn parse_structure(s: &str) -> Option<Value> {
    serde_json::from_str::<Value>(s)
        .ok()
        .filter(|v| v.is_object() || v.is_array())
}

/// Parse model output, attempting each recovery strategy in order.
pub fn parse_model_json(text: &str) -> Result<ParsedJson, ParseFailure> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseFailure {
            reason: "empty input".to_string(),
            preview: String::new(),
        });
    }

    // 1. Direct strict parse
    if let Some(value) = parse_structure(trimmed) {
        return Ok(ParsedJson {
            value,
            method: ParseMethod::Direct,
        });
    }

    // 2. Fenced code block
    if let Some(captures) = FENCED_BLOCK.captures(trimmed) {
        if let Some(value) = parse_structure(captures[1].trim()) {
            return Ok(ParsedJson {
                value,
                method: ParseMethod::FencedBlock,
            });
        }
    }

    // 3-5. Brace slice, progressively repaired
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}').filter(|&end| end > start) {
            let slice = &trimmed[start..=end];

            if let Some(value) = parse_structure(slice) {
                return Ok(ParsedJson {
                    value,
                    method: ParseMethod::Sliced,
                });
            }

            let sanitized = sanitize_json(slice);
            if let Some(value) = parse_structure(&sanitized) {
                return Ok(ParsedJson {
                    value,
                    method: ParseMethod::Sanitized,
                });
            }
        }

        // Balancing works on everything from the first brace: a truncated
        // response usually has no usable closing brace at all.
        let balanced = balance_brackets(&sanitize_json(&trimmed[start..]));
        if let Some(value) = parse_structure(&balanced) {
            return Ok(ParsedJson {
                value,
                method: ParseMethod::BracketBalanced,
            });
        }
    }

    // 6. Scan for any well-formed top-level object
    for candidate in scan_objects(trimmed) {
        if let Some(value) = parse_structure(candidate) {
            return Ok(ParsedJson {
                value,
                method: ParseMethod::ObjectScan,
            });
        }
    }

    Err(ParseFailure {
        reason: "no recovery strategy produced valid JSON".to_string(),
        preview: trimmed.chars().take(200).collect(),
    })
}

/// Remove a BOM, control characters (keeping newlines and tabs), bad quote
/// escapes, and trailing commas.
fn sanitize_json(s: &str) -> String {
    let cleaned: String = s
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
        .collect();
    let cleaned = cleaned.replace("\\'", "'");
    TRAILING_COMMA.replace_all(&cleaned, "$1").into_owned()
}

/// Close an unterminated string and append the missing closers in reverse
/// opening order (a stack, so nesting like `{[{` closes as `}]}`).
fn balance_brackets(s: &str) -> String {
    let mut out = s.trim().to_string();
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in out.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => stack.push('}'),
            '[' if !in_string => stack.push(']'),
            '}' | ']' if !in_string => {
                stack.pop();
            }
            _ => {}
        }
    }

    if in_string {
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

/// All complete top-level `{...}` spans, string-aware.
fn scan_objects(text: &str) -> Vec<&str> {
    let mut results = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start.take() {
                            results.push(&text[s..=i]);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_parse() {
        let parsed = parse_model_json(r#"{"knowledgePoints": []}"#).unwrap();
        assert_eq!(parsed.method, ParseMethod::Direct);
        assert!(parsed.value.get("knowledgePoints").is_some());
    }

    #[test]
    fn test_fenced_block_parses_identically() {
        let bare = r#"{"knowledgePoints": [{"id": "1", "content": "x"}]}"#;
        let fenced = format!("```json\n{}\n```", bare);

        let from_bare = parse_model_json(bare).unwrap();
        let from_fenced = parse_model_json(&fenced).unwrap();
        assert_eq!(from_fenced.method, ParseMethod::FencedBlock);
        assert_eq!(from_bare.value, from_fenced.value);
    }

    #[test]
    fn test_fenced_block_without_language_tag() {
        let parsed = parse_model_json("```\n{\"a\": 1}\n```").unwrap();
        assert_eq!(parsed.method, ParseMethod::FencedBlock);
    }

    #[test]
    fn test_slice_through_surrounding_prose() {
        let text = r#"Here is the result: {"a": 1} hope that helps!"#;
        let parsed = parse_model_json(text).unwrap();
        assert_eq!(parsed.method, ParseMethod::Sliced);
        assert_eq!(parsed.value["a"], 1);
    }

    #[test]
    fn test_sanitize_trailing_comma() {
        let text = "{\"a\": [1, 2,], \"b\": 3,}";
        let parsed = parse_model_json(text).unwrap();
        assert_eq!(parsed.method, ParseMethod::Sanitized);
        assert_eq!(parsed.value["b"], 3);
    }

    #[test]
    fn test_sanitize_control_characters() {
        let text = "{\"a\": \"x\u{0008}y\"}";
        let parsed = parse_model_json(text).unwrap();
        assert_eq!(parsed.method, ParseMethod::Sanitized);
    }

    #[test]
    fn test_truncated_response_bracket_balanced() {
        let text = r#"{"knowledgePoints":[{"id":"1""#;
        let parsed = parse_model_json(text).unwrap();
        assert_eq!(parsed.method, ParseMethod::BracketBalanced);
        let points = parsed.value["knowledgePoints"].as_array().unwrap();
        assert_eq!(points[0]["id"], "1");
    }

    #[test]
    fn test_truncated_mid_string_closes_string() {
        let text = r#"{"fragment": "half a quest"#;
        let parsed = parse_model_json(text).unwrap();
        assert_eq!(parsed.method, ParseMethod::BracketBalanced);
        assert_eq!(parsed.value["fragment"], "half a quest");
    }

    #[test]
    fn test_object_scan_picks_first_parseable() {
        let text = "junk } not json { \"broken\": } more junk {\"ok\": true} tail";
        let parsed = parse_model_json(text).unwrap();
        assert_eq!(parsed.method, ParseMethod::ObjectScan);
        assert_eq!(parsed.value["ok"], true);
    }

    #[test]
    fn test_scalar_json_is_rejected() {
        // A bare string parses as JSON but is not a usable structure.
        assert!(parse_model_json("\"just a string\"").is_err());
        assert!(parse_model_json("42").is_err());
    }

    #[test]
    fn test_total_failure_reports_preview() {
        let err = parse_model_json("completely unusable text").unwrap_err();
        assert!(!err.reason.is_empty());
        assert!(err.preview.starts_with("completely"));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(parse_model_json("   ").is_err());
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let text = r#"{"content": "set {a, b} and [c]"}"#;
        let parsed = parse_model_json(text).unwrap();
        assert_eq!(parsed.method, ParseMethod::Direct);
        assert_eq!(parsed.value["content"], "set {a, b} and [c]");
    }
}
