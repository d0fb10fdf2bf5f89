//! Assembly of one [`Issue`] from one [`RawIssue`].

use crate::adf;
use crate::assignee::build_assignee_timeline;
use crate::config::ReconstructionConfig;
use crate::event::{extract_events, is_subtask_type, parse_timestamp, sorted_histories, ValueKind};
use crate::fields::AdditionalFieldExtractor;
use crate::issue::{Dependency, Issue, IssueType, KeyChange};
use crate::raw::{RawHistory, RawIssue};
use crate::sprint::{parse_snapshot_sprints, SnapshotSprint, SprintMembershipReconstructor};
use crate::status::{status_changed, StatusTimelineBuilder};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Changelog field name for key renames.
pub const KEY_FIELD: &str = "Key";

/// Converts raw issues using lookup tables shared across a sync run.
#[derive(Debug, Clone)]
pub struct IssueAssembler {
    config: Arc<ReconstructionConfig>,
}

impl IssueAssembler {
    #[must_use]
    pub const fn new(config: Arc<ReconstructionConfig>) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    /// Reconstruct one issue. Never fails; malformed parts degrade.
    #[must_use]
    pub fn assemble(&self, raw: &RawIssue) -> Issue {
        assemble_issue(raw, &self.config)
    }
}

/// Reconstruct one issue from its snapshot and audit log.
#[must_use]
pub fn assemble_issue(raw: &RawIssue, config: &ReconstructionConfig) -> Issue {
    let key = raw.key.as_str();
    let histories = sorted_histories(raw.histories());

    let created = timestamp_field(raw, "created");
    if created.is_none() {
        warn!(issue = %key, "Issue has no creation time, history will be partial");
    }

    let issue_type = raw.field("issuetype").and_then(|t| {
        let name = t.get("name")?.as_str()?.to_string();
        let flagged = t.get("subtask").and_then(Value::as_bool).unwrap_or(false);
        Some(IssueType {
            is_subtask: flagged || is_subtask_type(&name),
            name,
        })
    });
    let is_subtask = issue_type.as_ref().is_some_and(|t| t.is_subtask);

    let statuses = StatusTimelineBuilder::new(&config.statuses, key);
    let current_status = raw.field_str("status", "name");
    let status_changelog = statuses.build(&histories, created, current_status);

    let assignee = current_assignee(raw);
    let assignees = build_assignee_timeline(&histories, created, assignee.as_deref());

    let snapshot: Vec<SnapshotSprint> = config
        .sprint_field_ids()
        .iter()
        .filter_map(|id| raw.field(id))
        .flat_map(|value| parse_snapshot_sprints(value, key))
        .collect();
    let sprint_info =
        SprintMembershipReconstructor::new(key).reconstruct(&histories, created, is_subtask, &snapshot);

    let additional_fields = AdditionalFieldExtractor::new(config.additional_fields_array_limit, key)
        .extract_all(raw, config);

    debug!(
        issue = %key,
        status_points = status_changelog.len(),
        assignee_points = assignees.len(),
        "Reconstructed issue"
    );

    Issue {
        id: raw.id.clone(),
        key: raw.key.clone(),
        url: config
            .base_url
            .as_ref()
            .map(|base| format!("{base}/browse/{key}")),
        issue_type,
        project: raw.field_str("project", "key").map(String::from),
        priority: raw.field_str("priority", "name").map(String::from),
        labels: string_list(raw.field("labels")),
        parent: raw.field_str("parent", "key").map(String::from),
        subtasks: subtask_keys(raw),
        summary: raw.field("summary").and_then(Value::as_str).map(String::from),
        description: raw.field("description").and_then(adf::extract_text),
        resolution: raw.field_str("resolution", "name").map(String::from),
        resolution_date: timestamp_field(raw, "resolutiondate"),
        created,
        updated: timestamp_field(raw, "updated"),
        status: current_status.map(|name| statuses.resolve(name)),
        assignee,
        dependencies: dependencies(raw),
        status_changed: status_changed(&status_changelog),
        status_changelog,
        assignees,
        sprint_info,
        key_changelog: key_changelog(&histories),
        additional_fields,
    }
}

fn timestamp_field(raw: &RawIssue, id: &str) -> Option<DateTime<Utc>> {
    let value = raw.field(id)?.as_str()?;
    match parse_timestamp(value) {
        Ok(ts) => Some(ts),
        Err(e) => {
            warn!(issue = %raw.key, field = id, error = %e, "Ignoring unparseable timestamp");
            None
        }
    }
}

/// Account id on Cloud; user name or key on Server.
fn current_assignee(raw: &RawIssue) -> Option<String> {
    ["accountId", "name", "key"]
        .iter()
        .find_map(|prop| raw.field_str("assignee", prop))
        .map(String::from)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn subtask_keys(raw: &RawIssue) -> Vec<String> {
    raw.field("subtasks")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|s| s.get("key")?.as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn dependencies(raw: &RawIssue) -> Vec<Dependency> {
    let Some(links) = raw.field("issuelinks").and_then(Value::as_array) else {
        return Vec::new();
    };

    links
        .iter()
        .filter_map(|link| {
            let (side, phrase) = if link.get("inwardIssue").is_some() {
                ("inwardIssue", "inward")
            } else {
                ("outwardIssue", "outward")
            };
            let key = link.get(side)?.get("key")?.as_str()?;
            let link_type = link.get("type")?;
            let relation = link_type
                .get(phrase)
                .or_else(|| link_type.get("name"))?
                .as_str()?;

            Some(Dependency {
                key: key.to_string(),
                relation: relation.to_string(),
            })
        })
        .collect()
}

fn key_changelog(histories: &[RawHistory]) -> Vec<KeyChange> {
    extract_events(histories, KEY_FIELD, ValueKind::Display)
        .into_iter()
        .filter_map(|event| {
            Some(KeyChange {
                old_key: event.from?,
                new_key: event.to?,
                changed_at: event.changed_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldCatalog, Status, StatusTable};
    use crate::sprint::SprintInterval;
    use crate::status::StatusPoint;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config() -> ReconstructionConfig {
        ReconstructionConfig::new(
            FieldCatalog::new([
                ("customfield_10020", "Sprint"),
                ("customfield_10050", "Severity"),
            ]),
            StatusTable::new([
                ("Open", Status::new("Todo", "open")),
                ("Done", Status::new("Done", "done")),
            ]),
        )
        .with_additional_fields(["customfield_10050"])
        .with_base_url("https://acme.atlassian.net")
    }

    fn day(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, day, 0, 0, 0).unwrap()
    }

    fn raw(value: Value) -> RawIssue {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_open_to_done_scenario() {
        let issue = assemble_issue(
            &raw(json!({
                "id": "10001",
                "key": "PROJ-1",
                "fields": {
                    "created": "2024-01-01T00:00:00.000+0000",
                    "status": {"name": "Done"},
                    "issuetype": {"name": "Story", "subtask": false}
                },
                "changelog": {"histories": [{
                    "created": "2024-02-01T00:00:00.000+0000",
                    "items": [{"field": "status", "fromString": "Open", "toString": "Done"}]
                }]}
            })),
            &config(),
        );

        assert_eq!(
            issue.status_changelog,
            vec![
                StatusPoint {
                    status: Status::new("Todo", "open"),
                    changed_at: day(1, 1),
                },
                StatusPoint {
                    status: Status::new("Done", "done"),
                    changed_at: day(2, 1),
                },
            ]
        );
        assert_eq!(issue.status_changed, Some(day(2, 1)));
        assert_eq!(issue.status, Some(Status::new("Done", "done")));
        assert_eq!(issue.url.as_deref(), Some("https://acme.atlassian.net/browse/PROJ-1"));
    }

    #[test]
    fn test_no_changelog_single_status_point() {
        let issue = assemble_issue(
            &raw(json!({
                "id": "2",
                "key": "PROJ-2",
                "fields": {
                    "created": "2024-01-01T00:00:00Z",
                    "status": {"name": "Open"}
                }
            })),
            &config(),
        );

        assert_eq!(issue.status_changelog.len(), 1);
        assert_eq!(issue.status_changelog[0].changed_at, day(1, 1));
        assert_eq!(issue.status_changelog[0].status, Status::new("Todo", "open"));
        assert!(issue.assignees.is_empty());
        assert!(issue.key_changelog.is_empty());
    }

    #[test]
    fn test_subtask_sprint_omitted() {
        let issue = assemble_issue(
            &raw(json!({
                "id": "3",
                "key": "PROJ-3",
                "fields": {
                    "created": "2024-01-01T00:00:00Z",
                    "issuetype": {"name": "Sub-task", "subtask": true},
                    "customfield_10020": [{"id": 5, "state": "active"}],
                    "parent": {"key": "PROJ-1"}
                }
            })),
            &config(),
        );

        assert!(issue.sprint_info.is_none());
        assert!(issue.is_subtask());
        assert_eq!(issue.parent.as_deref(), Some("PROJ-1"));
    }

    #[test]
    fn test_snapshot_and_passthrough_fields() {
        let issue = assemble_issue(
            &raw(json!({
                "id": "4",
                "key": "NEW-4",
                "fields": {
                    "created": "2024-01-01T00:00:00Z",
                    "updated": "2024-03-01T00:00:00Z",
                    "resolutiondate": "2024-02-20T00:00:00.000+0000",
                    "summary": "Checkout fails",
                    "description": {"type": "doc", "content": [
                        {"type": "paragraph", "content": [{"type": "text", "text": "Stack trace attached"}]}
                    ]},
                    "project": {"key": "NEW"},
                    "priority": {"name": "High"},
                    "labels": ["backend", "payments"],
                    "resolution": {"name": "Fixed"},
                    "assignee": {"accountId": "acc-7", "displayName": "Grace"},
                    "subtasks": [{"key": "NEW-5"}, {"key": "NEW-6"}],
                    "issuelinks": [
                        {"type": {"name": "Blocks", "inward": "is blocked by", "outward": "blocks"},
                         "inwardIssue": {"key": "NEW-1"}},
                        {"type": {"name": "Relates", "inward": "relates to", "outward": "relates to"},
                         "outwardIssue": {"key": "OPS-9"}}
                    ],
                    "customfield_10020": [
                        {"id": 30, "state": "closed", "completeDate": "2024-01-20T00:00:00Z"},
                        {"id": 31, "state": "active"}
                    ],
                    "customfield_10050": {"value": "High", "child": {"value": "Urgent"}}
                },
                "changelog": {"histories": [{
                    "created": "2024-01-10T00:00:00Z",
                    "items": [{"field": "Key", "fromString": "OLD-12", "toString": "NEW-4"}]
                }]}
            })),
            &config(),
        );

        assert_eq!(issue.summary.as_deref(), Some("Checkout fails"));
        assert_eq!(issue.description.as_deref(), Some("Stack trace attached"));
        assert_eq!(issue.project.as_deref(), Some("NEW"));
        assert_eq!(issue.priority.as_deref(), Some("High"));
        assert_eq!(issue.labels, vec!["backend", "payments"]);
        assert_eq!(issue.resolution.as_deref(), Some("Fixed"));
        assert_eq!(issue.resolution_date, Some(day(2, 20)));
        assert_eq!(issue.updated, Some(day(3, 1)));
        assert_eq!(issue.subtasks, vec!["NEW-5", "NEW-6"]);
        assert_eq!(
            issue.dependencies,
            vec![
                Dependency {
                    key: "NEW-1".to_string(),
                    relation: "is blocked by".to_string(),
                },
                Dependency {
                    key: "OPS-9".to_string(),
                    relation: "relates to".to_string(),
                },
            ]
        );
        assert_eq!(issue.assignee.as_deref(), Some("acc-7"));
        assert_eq!(issue.assignees[0].uid, "acc-7");
        assert_eq!(issue.original_key(), "OLD-12");
        assert_eq!(issue.key_changelog[0].changed_at, day(1, 10));

        let sprint_info = issue.sprint_info.unwrap();
        assert_eq!(sprint_info.current_sprint_id, Some(31));
        assert_eq!(
            sprint_info.history,
            vec![SprintInterval {
                sprint_id: 31,
                added_at: day(1, 1),
                removed_at: None,
            }]
        );

        assert_eq!(issue.additional_fields.len(), 1);
        assert_eq!(issue.additional_fields[0].value, "High -> Urgent");
    }

    #[test]
    fn test_unsorted_changelog_is_ordered() {
        let issue = assemble_issue(
            &raw(json!({
                "id": "5",
                "key": "PROJ-5",
                "fields": {"created": "2024-01-01T00:00:00Z", "status": {"name": "Open"}},
                "changelog": {"histories": [
                    {"created": "2024-03-01T00:00:00Z",
                     "items": [{"field": "Sprint", "from": "8", "to": ""}]},
                    {"created": "2024-02-01T00:00:00Z",
                     "items": [{"field": "Sprint", "from": "", "to": "8"}]}
                ]}
            })),
            &config(),
        );

        assert_eq!(
            issue.sprint_info.unwrap().history,
            vec![SprintInterval {
                sprint_id: 8,
                added_at: day(2, 1),
                removed_at: Some(day(3, 1)),
            }]
        );
    }

    #[test]
    fn test_incomplete_issue_is_best_effort() {
        let issue = assemble_issue(
            &raw(json!({
                "id": "6",
                "key": "PROJ-6",
                "fields": {"created": "garbage", "customfield_10020": "nonsense"},
                "changelog": {"histories": [
                    {"created": "also garbage", "items": [{"field": "status", "toString": "Done"}]}
                ]}
            })),
            &config(),
        );

        assert!(issue.created.is_none());
        assert!(issue.status_changelog.is_empty());
        assert!(issue.status_changed.is_none());
        assert!(issue.sprint_info.is_none());
        assert_eq!(issue.key, "PROJ-6");
    }

    #[test]
    fn test_assembler_is_repeatable() {
        let assembler = IssueAssembler::new(Arc::new(config()));
        let input = raw(json!({
            "id": "7",
            "key": "PROJ-7",
            "fields": {"created": "2024-01-01T00:00:00Z", "status": {"name": "Done"}},
            "changelog": {"histories": [
                {"created": "2024-01-05T00:00:00Z", "items": [
                    {"field": "Sprint", "from": "", "to": "1"},
                    {"field": "status", "fromString": "Open", "toString": "Done"}
                ]},
                {"created": "2024-01-09T00:00:00Z", "items": [{"field": "Sprint", "from": "1", "to": "1,2"}]}
            ]}
        }));

        assert_eq!(assembler.assemble(&input), assembler.assemble(&input));
        assert_eq!(assembler.config().additional_fields_array_limit, 50);
    }
}
