//! Reconstructed issue model.

use crate::assignee::AssigneePoint;
use crate::config::Status;
use crate::fields::AdditionalField;
use crate::sprint::SprintInfo;
use crate::status::StatusPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An issue's current snapshot plus its reconstructed history.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Numeric Jira id.
    pub id: String,

    /// Current key (e.g., "PROJ-42").
    pub key: String,

    /// Browse URL, when the site base URL is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,

    /// Project key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    /// Parent issue key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Sub-task keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Description as plain text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    /// Current status, resolved through the status table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    /// Current assignee account id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,

    pub status_changelog: Vec<StatusPoint>,

    /// Time of the last status change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_changed: Option<DateTime<Utc>>,

    pub assignees: Vec<AssigneePoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint_info: Option<SprintInfo>,

    pub key_changelog: Vec<KeyChange>,

    pub additional_fields: Vec<AdditionalField>,
}

impl Issue {
    /// Whether the issue is currently a sub-task.
    #[must_use]
    pub fn is_subtask(&self) -> bool {
        self.issue_type.as_ref().is_some_and(|t| t.is_subtask)
    }

    /// Key the issue was created under (before any renames).
    #[must_use]
    pub fn original_key(&self) -> &str {
        self.key_changelog
            .first()
            .map_or(self.key.as_str(), |c| c.old_key.as_str())
    }
}

/// Issue type as seen on the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueType {
    pub name: String,
    pub is_subtask: bool,
}

/// The issue was renamed (moved between projects) at `changed_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyChange {
    pub old_key: String,
    pub new_key: String,
    pub changed_at: DateTime<Utc>,
}

/// A link to another issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Linked issue key.
    pub key: String,
    /// Link phrase from this issue's side (e.g., "is blocked by").
    pub relation: String,
}
