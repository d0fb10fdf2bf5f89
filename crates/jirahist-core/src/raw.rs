//! Raw Jira issue payloads as returned by the REST API with `expand=changelog`.

use crate::error::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Treat an explicit JSON `null` like a missing value.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One issue as fetched from Jira: current field snapshot plus audit log.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawIssue {
    /// Numeric issue id (as a string).
    pub id: String,

    /// Current issue key (e.g., "PROJ-42").
    pub key: String,

    /// REST self link.
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,

    /// Field id -> raw value.
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Map<String, Value>,

    /// Audit log of field changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<RawChangelog>,
}

impl RawIssue {
    /// Decode one issue from an already parsed JSON value.
    ///
    /// # Errors
    /// Returns `CoreError::Json` if the value is not an issue object.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Raw value of a field, treating JSON null as absent.
    #[must_use]
    pub fn field(&self, id: &str) -> Option<&Value> {
        self.fields.get(id).filter(|v| !v.is_null())
    }

    /// String at `fields.<id>.<prop>`.
    #[must_use]
    pub fn field_str(&self, id: &str, prop: &str) -> Option<&str> {
        self.field(id)?.get(prop)?.as_str()
    }

    /// Audit entries, empty when the changelog was not expanded.
    #[must_use]
    pub fn histories(&self) -> &[RawHistory] {
        self.changelog
            .as_ref()
            .map(|c| c.histories.as_slice())
            .unwrap_or_default()
    }
}

/// The `changelog` envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawChangelog {
    #[serde(default, deserialize_with = "null_as_default")]
    pub histories: Vec<RawHistory>,
}

/// One audit record: a batch of simultaneous field changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawHistory {
    /// Timestamp as sent by Jira; parsed lazily so one bad value only drops
    /// this entry. A `null` timestamp reads as empty.
    #[serde(default, deserialize_with = "null_as_default")]
    pub created: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<RawChangeItem>,
}

/// A single field change inside an audit record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawChangeItem {
    /// Field display name ("status", "Sprint", "Key", ...).
    #[serde(default, deserialize_with = "null_as_default")]
    pub field: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_string: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_string: Option<String>,

    /// Raw id before the change (account id, comma-separated sprint ids, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// Decode a list of issue values, skipping the ones that are not issues.
///
/// `origin` names the batch in log output.
#[must_use]
pub fn decode_issues(values: Vec<Value>, origin: &str) -> Vec<RawIssue> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let key = value
                .get("key")
                .and_then(Value::as_str)
                .unwrap_or("?")
                .to_string();
            match RawIssue::from_value(value) {
                Ok(issue) => Some(issue),
                Err(e) => {
                    warn!(origin, index, issue = %key, error = %e, "Skipping malformed issue");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_jira_payload() {
        let raw: RawIssue = serde_json::from_value(json!({
            "id": "10001",
            "key": "PROJ-1",
            "self": "https://acme.atlassian.net/rest/api/3/issue/10001",
            "fields": {"summary": "Fix login", "assignee": null},
            "changelog": {
                "histories": [{
                    "created": "2024-01-02T10:00:00.000+0000",
                    "items": [{"field": "status", "fromString": "Open", "toString": "Done", "from": "1", "to": "3"}]
                }]
            }
        }))
        .unwrap();

        assert_eq!(raw.key, "PROJ-1");
        assert!(raw.field("assignee").is_none());
        assert_eq!(raw.histories().len(), 1);

        let item = &raw.histories()[0].items[0];
        assert_eq!(item.from_string.as_deref(), Some("Open"));
        assert_eq!(item.to.as_deref(), Some("3"));
    }

    #[test]
    fn test_missing_changelog() {
        let raw: RawIssue = serde_json::from_value(json!({"id": "1", "key": "A-1"})).unwrap();
        assert!(raw.histories().is_empty());
        assert!(raw.fields.is_empty());
    }

    #[test]
    fn test_null_audit_timestamp_is_tolerated() {
        let raw: RawIssue = serde_json::from_value(json!({
            "id": "1",
            "key": "A-1",
            "fields": null,
            "changelog": {"histories": [
                {"created": null, "items": []},
                {"created": "2024-01-02T10:00:00Z", "items": null}
            ]}
        }))
        .unwrap();

        assert_eq!(raw.histories().len(), 2);
        assert!(raw.histories()[0].created.is_empty());
        assert!(raw.histories()[1].items.is_empty());
    }

    #[test]
    fn test_decode_issues_skips_bad_records() {
        let values = vec![
            json!({"id": "1", "key": "A-1"}),
            json!({"id": "2"}),
            json!("not an issue"),
            json!({"id": "4", "key": "A-4", "changelog": {"histories": [{"created": null, "items": []}]}}),
        ];

        let issues = decode_issues(values, "test");

        let keys: Vec<_> = issues.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["A-1", "A-4"]);
    }
}
