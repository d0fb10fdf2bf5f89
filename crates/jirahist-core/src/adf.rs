//! Plain text from Jira's Atlassian Document Format (ADF).

use serde_json::Value;

/// Extract text nodes from an ADF document, joined by spaces.
///
/// Plain strings (Jira Server, API v2) pass through unchanged.
#[must_use]
pub fn extract_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(nodes) => {
            let parts: Vec<String> = nodes.iter().filter_map(extract_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        Value::Object(obj) => {
            if obj.get("type").and_then(Value::as_str) == Some("text") {
                return obj.get("text").and_then(Value::as_str).map(String::from);
            }
            obj.get("content").and_then(extract_text)
        }
        _ => None,
    }
}
