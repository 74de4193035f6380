//! Tolerant recovery of a single JSON object from model output.
//!
//! Language models asked for "only JSON" still wrap it in Markdown fences,
//! prepend a sentence of prose, or put raw newlines inside a long free-text
//! value. [`recover_object`] locates the first object in such a response and
//! decodes it, applying one [`FieldRepair`] pass when the first decode fails.
//!
//! ## Boundary detection
//!
//! The end of the object is found by counting `{` and `}` from the first
//! `{`. The scan does not track string literals, so a brace inside a string
//! value can move the end. When the depth never returns to zero the object
//! runs to the end of the text and the decoder reports the truncation.

use crate::error::RecoveryError;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// A decoded key/value object returned by a model.
pub type ParsedStructure = Map<String, Value>;

/// Re-escapes the raw text of one free-text field that sits between two
/// known keys.
///
/// The value is taken as everything between `"field": "` and the last quote
/// before `, "next_field"`, so unescaped quotes and newlines inside it are
/// captured whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRepair {
    pub field: &'static str,
    pub next_field: &'static str,
}

impl FieldRepair {
    /// Report responses: `summary` is followed by `keyFindings`.
    pub const SUMMARY: Self = Self::new("summary", "keyFindings");

    /// Storyboard responses: `narrative` is followed by `charts`.
    pub const NARRATIVE: Self = Self::new("narrative", "charts");

    pub const fn new(field: &'static str, next_field: &'static str) -> Self {
        Self { field, next_field }
    }

    /// Rewrite `candidate` with the field value escaped.
    ///
    /// Returns `Ok(None)` when the field/next-field pair is not present.
    pub fn apply(&self, candidate: &str) -> Result<Option<String>, RecoveryError> {
        let pattern = format!(
            r#""{}":\s*"((?s:.*?))"\s*,\s*"{}""#,
            regex::escape(self.field),
            regex::escape(self.next_field)
        );
        let re = Regex::new(&pattern).map_err(|e| RecoveryError::RepairPattern {
            field: self.field.to_string(),
            detail: e.to_string(),
        })?;

        let Some(value) = re.captures(candidate).and_then(|caps| caps.get(1)) else {
            return Ok(None);
        };

        let mut repaired = String::with_capacity(candidate.len() + 16);
        repaired.push_str(&candidate[..value.start()]);
        repaired.push_str(&escape_free_text(value.as_str()));
        repaired.push_str(&candidate[value.end()..]);
        Ok(Some(repaired))
    }
}

/// Escape order matters: backslashes first, so the escapes added for the
/// other characters are not doubled.
fn escape_free_text(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
        .replace('"', "\\\"")
}

/// Recover the first JSON object in `text`.
///
/// Never panics. Returns [`RecoveryError::NoJsonObject`] when the text holds
/// no `{`, and [`RecoveryError::Malformed`] when the object still fails to
/// decode after `repair` has been applied.
pub fn recover_object(text: &str, repair: FieldRepair) -> Result<ParsedStructure, RecoveryError> {
    let body = strip_fence(text.trim());
    let candidate = locate_object(&body).ok_or(RecoveryError::NoJsonObject)?;

    let first_error = match serde_json::from_str::<ParsedStructure>(candidate) {
        Ok(map) => return Ok(map),
        Err(e) => e,
    };
    debug!(
        "Direct decode of recovered object failed ({first_error}); repairing '{}'",
        repair.field
    );

    let Some(repaired) = repair.apply(candidate)? else {
        warn!("No '{}' field to repair: {first_error}", repair.field);
        return Err(RecoveryError::Malformed {
            source: first_error,
        });
    };

    serde_json::from_str::<ParsedStructure>(&repaired).map_err(|e| {
        warn!("JSON still malformed after repairing '{}': {e}", repair.field);
        RecoveryError::Malformed { source: e }
    })
}

/// Drop a leading fence line, and the closing fence line when present.
fn strip_fence(text: &str) -> String {
    if !text.starts_with("```") {
        return text.to_string();
    }
    let lines: Vec<&str> = text.split('\n').collect();
    let inner = match lines.last() {
        Some(last) if lines.len() >= 2 && last.trim() == "```" => &lines[1..lines.len() - 1],
        _ => &lines[1..],
    };
    inner.join("\n")
}

/// Slice from the first `{` to the brace that brings the depth back to zero,
/// or to the end of the text.
fn locate_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth: usize = 0;
    let mut end = text.len();
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    end = start + offset + 1;
                    break;
                }
            }
            _ => {}
        }
    }
    Some(&text[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const INNER: &str =
        r#"{"id":"a","title":"T","summary":"S","keyFindings":["f"],"charts":[]}"#;

    #[test]
    fn fenced_object_with_prose_matches_direct_decode() {
        let text = format!(
            "Here is the report you asked for:\n```json\n{INNER}\n```\nLet me know if you need more."
        );
        // The prose line precedes the fence, so the fence is not stripped;
        // brace scanning still isolates the object.
        let recovered = recover_object(&text, FieldRepair::SUMMARY).unwrap();
        let direct: ParsedStructure = serde_json::from_str(INNER).unwrap();
        assert_eq!(recovered, direct);
    }

    #[test]
    fn leading_fence_is_stripped() {
        let text = format!("```json\n{INNER}\n```");
        let recovered = recover_object(&text, FieldRepair::SUMMARY).unwrap();
        assert_eq!(recovered["id"], json!("a"));
    }

    #[test]
    fn unclosed_single_line_fence_does_not_panic() {
        assert!(matches!(
            recover_object("```", FieldRepair::SUMMARY),
            Err(RecoveryError::NoJsonObject)
        ));
    }

    #[test]
    fn no_brace_is_nothing_recoverable() {
        let err = recover_object("I could not produce a report.", FieldRepair::SUMMARY)
            .unwrap_err();
        assert!(matches!(err, RecoveryError::NoJsonObject));
    }

    #[test]
    fn raw_newline_in_narrative_is_repaired() {
        let text = "{\"title\": \"Story\", \"narrative\": \"Line one\nLine \"two\"\tend\", \"charts\": []}";
        assert!(serde_json::from_str::<Value>(text).is_err());

        let recovered = recover_object(text, FieldRepair::NARRATIVE).unwrap();
        assert_eq!(recovered["narrative"], json!("Line one\nLine \"two\"\tend"));
        assert_eq!(recovered["charts"], json!([]));
    }

    #[test]
    fn raw_newline_in_summary_is_repaired() {
        let text = "{\"id\": \"x\", \"title\": \"T\", \"summary\": \"first\nsecond\", \"keyFindings\": [\"k\"]}";
        let recovered = recover_object(text, FieldRepair::SUMMARY).unwrap();
        assert_eq!(recovered["summary"], json!("first\nsecond"));
    }

    #[test]
    fn repair_without_matching_field_is_malformed() {
        let text = "{\"title\": \"bad\nvalue\", \"charts\": []}";
        let err = recover_object(text, FieldRepair::NARRATIVE).unwrap_err();
        assert!(matches!(err, RecoveryError::Malformed { .. }));
    }

    #[test]
    fn truncated_object_runs_to_end_and_fails_cleanly() {
        let err = recover_object("{\"id\": \"a\", \"title\": {", FieldRepair::SUMMARY)
            .unwrap_err();
        assert!(matches!(err, RecoveryError::Malformed { .. }));
    }

    #[test]
    fn nested_objects_are_kept_whole() {
        let text = r#"noise {"a": {"b": {"c": 1}}, "d": 2} trailing {"e": 3}"#;
        let recovered = recover_object(text, FieldRepair::SUMMARY).unwrap();
        assert_eq!(recovered["a"]["b"]["c"], json!(1));
        assert!(!recovered.contains_key("e"));
    }

    #[test]
    fn escape_order_keeps_backslashes_single() {
        assert_eq!(escape_free_text("a\\b\n"), "a\\\\b\\n");
    }

    #[test]
    fn custom_field_pair() {
        let repair = FieldRepair::new("body", "footer");
        let out = repair
            .apply("{\"body\": \"x\ny\", \"footer\": 1}")
            .unwrap()
            .unwrap();
        assert_eq!(out, "{\"body\": \"x\\ny\", \"footer\": 1}");
    }
}
