//! Outcome payloads: what the terminal `completed` event carries.
//!
//! The task result stays opaque in the job record. For the event payload we
//! additionally pull out a human-readable summary and any http(s) links found
//! in it, so stream consumers don't have to know the result shape.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s)]+").expect("link pattern is valid"));

/// Summary text of a task result, if it has one.
///
/// A bare string result is its own summary; an object may carry a `summary`
/// string field.
pub fn summary_of(result: &Value) -> Option<&str> {
    match result {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("summary").and_then(Value::as_str),
        _ => None,
    }
}

/// All http(s) links in `text`, in order of appearance.
pub fn extract_links(text: &str) -> Vec<String> {
    LINK_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Payload of the `completed` event for a successful result.
pub fn completed_payload(result: &Value) -> Value {
    match summary_of(result) {
        Some(summary) => json!({
            "result": result,
            "summary": summary,
            "links": extract_links(summary),
        }),
        None => json!({ "result": result }),
    }
}
