//! Recovery of structured JSON from free-form generator output.
//!
//! Generators wrap JSON in markdown fences, surround it with prose, and emit
//! near-JSON (trailing commas, unquoted keys, single quotes). The extractor
//! takes the first fenced block if there is one, otherwise the whole text,
//! and parses it as JSON5.

use crate::models::RecordKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Characters of the candidate text echoed back in a parse diagnostic.
pub const SNIPPET_CHARS: usize = 200;

/// Opening fence (optionally tagged `json`), lazily matched interior, closing fence.
static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[ \t]*(?i:json)?[ \t]*\r?\n?(.*?)\r?\n?[ \t]*```")
        .expect("fenced block pattern is valid")
});

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Generated content is empty")]
    Empty,

    #[error("Generated content is not parseable JSON: {diagnostic}")]
    Unparseable {
        diagnostic: String,
        /// Leading characters of the text that failed to parse.
        snippet: String,
    },

    #[error("Generated {kind} has the wrong shape: expected {expected}, found {found}")]
    ShapeMismatch {
        kind: RecordKind,
        expected: &'static str,
        found: &'static str,
    },
}

impl ExtractionError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ExtractionError::Empty => "empty",
            ExtractionError::Unparseable { .. } => "unparseable",
            ExtractionError::ShapeMismatch { .. } => "shape_mismatch",
        }
    }
}

/// A well-formed value tree recovered from generator output.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPayload {
    pub value: Value,
    /// Whether the value came from a fenced block rather than the whole text.
    pub fenced: bool,
}

impl ExtractedPayload {
    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Interior of the first fenced block in `raw`, if any.
pub fn find_fenced_block(raw: &str) -> Option<&str> {
    FENCED_BLOCK
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Recover a JSON value from `raw`.
///
/// Fails rather than returning an empty structure: a defaulted record would
/// be indistinguishable from a genuinely empty one downstream.
pub fn extract(raw: &str) -> Result<ExtractedPayload, ExtractionError> {
    let (candidate, fenced) = match find_fenced_block(raw) {
        Some(block) => (block, true),
        None => (raw, false),
    };

    let candidate = candidate.trim();
    if candidate.is_empty() {
        return Err(ExtractionError::Empty);
    }

    match json5::from_str::<Value>(candidate) {
        Ok(value) => Ok(ExtractedPayload { value, fenced }),
        Err(e) => Err(ExtractionError::Unparseable {
            diagnostic: diagnostic(&e),
            snippet: candidate.chars().take(SNIPPET_CHARS).collect(),
        }),
    }
}

/// Parser complaint without the echoed source line, which would leak
/// generator output into caller-visible errors.
fn diagnostic(err: &json5::Error) -> String {
    let json5::Error::Message { msg, location } = err;

    let complaint = msg
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("= "))
        .or_else(|| msg.lines().map(str::trim).find(|line| !line.is_empty()))
        .unwrap_or("invalid JSON");

    match location {
        Some(at) => format!("{} (line {}, column {})", complaint, at.line, at.column),
        None => complaint.to_string(),
    }
}

/// Reject payloads whose top-level shape cannot describe `kind`.
///
/// Reports and ingredient scans are objects. Recipe sets are arrays, or an
/// object carrying the array under `recipes`.
pub fn check_shape(payload: &ExtractedPayload, kind: RecordKind) -> Result<(), ExtractionError> {
    let value = &payload.value;
    let ok = match kind {
        RecordKind::HealthReport | RecordKind::IngredientList => value.is_object(),
        RecordKind::RecipeSet => {
            value.is_array() || value.get("recipes").map(Value::is_array).unwrap_or(false)
        }
    };

    if ok {
        return Ok(());
    }

    Err(ExtractionError::ShapeMismatch {
        kind,
        expected: match kind {
            RecordKind::RecipeSet => "an array of recipes",
            _ => "an object",
        },
        found: value_type_name(value),
    })
}

fn value_type_name(value: &Value) -> &'static str {
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
    use serde_json::json;

    #[test]
    fn fenced_block_inside_prose_is_extracted() {
        let raw = "Sure! Here is the report:\n```json\n{\"item_name\": \"milk\"}\n```\nLet me know.";
        assert_eq!(find_fenced_block(raw), Some("{\"item_name\": \"milk\"}"));

        let payload = extract(raw).unwrap();
        assert!(payload.fenced);
        assert_eq!(payload.value, json!({"item_name": "milk"}));
    }

    #[test]
    fn untagged_fence_is_accepted() {
        let raw = "```\n[\"eggs\", \"milk\"]\n```";
        let payload = extract(raw).unwrap();
        assert_eq!(payload.value, json!(["eggs", "milk"]));
    }

    #[test]
    fn only_the_first_fence_counts() {
        let raw = "```json\n{\"a\": \"first\"}\n```\ntext\n```json\n{\"b\": \"second\"}\n```";
        assert_eq!(extract(raw).unwrap().value, json!({"a": "first"}));
    }

    #[test]
    fn whole_text_is_used_without_a_fence() {
        let payload = extract("  {\"symptoms\": [\"cough\"]}  ").unwrap();
        assert!(!payload.fenced);
        assert_eq!(payload.value["symptoms"][0], "cough");
    }

    #[test]
    fn near_json_is_tolerated() {
        let raw = "```json\n{item_name: 'oat milk', tags: ['dairy-free',],}\n```";
        let value = extract(raw).unwrap().into_value();
        assert_eq!(value, json!({"item_name": "oat milk", "tags": ["dairy-free"]}));
    }

    #[test]
    fn prose_refusal_fails_with_diagnostic_and_snippet() {
        let err = extract("I cannot help with that.").unwrap_err();
        match err {
            ExtractionError::Unparseable {
                diagnostic,
                snippet,
            } => {
                assert!(!diagnostic.is_empty());
                assert!(!diagnostic.contains("cannot help"));
                assert_eq!(snippet, "I cannot help with that.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn snippet_is_bounded() {
        let raw = "x".repeat(SNIPPET_CHARS * 3);
        match extract(&raw).unwrap_err() {
            ExtractionError::Unparseable { snippet, .. } => {
                assert_eq!(snippet.chars().count(), SNIPPET_CHARS)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_fence_is_an_error() {
        assert!(matches!(
            extract("```json\n\n```"),
            Err(ExtractionError::Empty)
        ));
        assert!(matches!(extract("   "), Err(ExtractionError::Empty)));
    }

    #[test]
    fn shape_check_rejects_array_for_report() {
        let payload = extract("[1, 2]").unwrap();
        let err = check_shape(&payload, RecordKind::HealthReport).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::ShapeMismatch {
                found: "an array",
                ..
            }
        ));
    }

    #[test]
    fn shape_check_accepts_wrapped_recipes() {
        let wrapped = extract("{\"recipes\": []}").unwrap();
        assert!(check_shape(&wrapped, RecordKind::RecipeSet).is_ok());

        let bare = extract("[]").unwrap();
        assert!(check_shape(&bare, RecordKind::RecipeSet).is_ok());

        let object = extract("{\"name\": \"soup\"}").unwrap();
        assert!(check_shape(&object, RecordKind::RecipeSet).is_err());
    }
}
