//! Field-level change events extracted from the raw audit log.

use crate::error::{CoreError, Result};
use crate::raw::{RawChangeItem, RawHistory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Changelog field name for issue type changes.
pub const ISSUE_TYPE_FIELD: &str = "issuetype";

/// Which pair of values to read from a change item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueKind {
    /// `fromString` / `toString`: human-readable names.
    #[default]
    Display,
    /// `from` / `to`: raw ids (account ids, sprint id lists).
    Raw,
}

impl ValueKind {
    fn pick(self, item: &RawChangeItem) -> (Option<String>, Option<String>) {
        match self {
            Self::Display => (item.from_string.clone(), item.to_string.clone()),
            Self::Raw => (item.from.clone(), item.to.clone()),
        }
    }
}

/// An issue type change recorded in the same audit entry as another change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeChange {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl TypeChange {
    /// The issue stopped being a sub-task.
    #[must_use]
    pub fn leaves_subtask(&self) -> bool {
        self.from.as_deref().is_some_and(is_subtask_type)
            && !self.to.as_deref().is_some_and(is_subtask_type)
    }

    /// The issue became a sub-task.
    #[must_use]
    pub fn enters_subtask(&self) -> bool {
        self.to.as_deref().is_some_and(is_subtask_type)
            && !self.from.as_deref().is_some_and(is_subtask_type)
    }
}

/// One change to one field at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub field: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub changed_at: DateTime<Utc>,
    /// Issue type change found in the same audit entry, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_change: Option<TypeChange>,
}

/// Whether an issue type name denotes a sub-task ("Sub-task", "Subtask").
#[must_use]
pub fn is_subtask_type(name: &str) -> bool {
    let name = name.trim();
    name.eq_ignore_ascii_case("sub-task") || name.eq_ignore_ascii_case("subtask")
}

/// Parse a Jira timestamp into UTC.
///
/// Accepts RFC 3339 and the `2024-01-01T10:00:00.000+0000` form Jira emits.
///
/// # Errors
/// Returns `CoreError::InvalidTimestamp` if neither form matches.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    DateTime::parse_from_rfc3339(input)
        .or_else(|_| DateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| CoreError::InvalidTimestamp(input.to_string()))
}

/// Extract every change to `field` from ascending audit entries.
///
/// Entries with unparseable timestamps are skipped.
#[must_use]
pub fn extract_events(histories: &[RawHistory], field: &str, kind: ValueKind) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for history in histories {
        let matching: Vec<&RawChangeItem> =
            history.items.iter().filter(|i| i.field == field).collect();
        if matching.is_empty() {
            continue;
        }

        let changed_at = match parse_timestamp(&history.created) {
            Ok(ts) => ts,
            Err(e) => {
                debug!(field, error = %e, "Dropping audit entry");
                continue;
            }
        };

        let type_change = history
            .items
            .iter()
            .find(|i| i.field == ISSUE_TYPE_FIELD)
            .map(|i| TypeChange {
                from: i.from_string.clone(),
                to: i.to_string.clone(),
            });

        for item in matching {
            let (from, to) = kind.pick(item);
            events.push(ChangeEvent {
                field: item.field.clone(),
                from,
                to,
                changed_at,
                type_change: type_change.clone(),
            });
        }
    }

    events
}

/// Audit entries ordered ascending by timestamp.
///
/// The sort is stable, so entries sharing a timestamp keep their log order;
/// unparseable entries sort first and are dropped later by extraction.
#[must_use]
pub fn sorted_histories(histories: &[RawHistory]) -> Vec<RawHistory> {
    let mut keyed: Vec<(Option<DateTime<Utc>>, &RawHistory)> = histories
        .iter()
        .map(|h| (parse_timestamp(&h.created).ok(), h))
        .collect();
    keyed.sort_by_key(|(ts, _)| *ts);
    keyed.into_iter().map(|(_, h)| h.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn item(field: &str, from: &str, to: &str) -> RawChangeItem {
        RawChangeItem {
            field: field.to_string(),
            from_string: Some(from.to_string()),
            to_string: Some(to.to_string()),
            from: Some(format!("id:{from}")),
            to: Some(format!("id:{to}")),
        }
    }

    fn history(created: &str, items: Vec<RawChangeItem>) -> RawHistory {
        RawHistory {
            created: created.to_string(),
            items,
        }
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        assert_eq!(parse_timestamp("2024-01-01T10:00:00.000+0000").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T10:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T12:00:00.000+0200").unwrap(), expected);
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(CoreError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_extract_matching_field() {
        let histories = vec![
            history("2024-01-02T00:00:00Z", vec![item("status", "Open", "In Progress")]),
            history("2024-01-03T00:00:00Z", vec![item("priority", "Low", "High")]),
            history("2024-01-04T00:00:00Z", vec![item("status", "In Progress", "Done")]),
        ];

        let events = extract_events(&histories, "status", ValueKind::Display);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].from.as_deref(), Some("Open"));
        assert_eq!(events[1].to.as_deref(), Some("Done"));
        assert_eq!(
            events[1].changed_at,
            Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap()
        );
        assert!(events[0].type_change.is_none());
    }

    #[test]
    fn test_extract_raw_values() {
        let histories = vec![history("2024-01-02T00:00:00Z", vec![item("assignee", "a", "b")])];
        let events = extract_events(&histories, "assignee", ValueKind::Raw);
        assert_eq!(events[0].to.as_deref(), Some("id:b"));
    }

    #[test]
    fn test_bad_timestamp_dropped() {
        let histories = vec![
            history("not a date", vec![item("status", "Open", "Done")]),
            history("", vec![item("status", "Open", "Blocked")]),
            history("2024-01-02T00:00:00Z", vec![item("status", "Done", "Open")]),
        ];

        let events = extract_events(&histories, "status", ValueKind::Display);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].to.as_deref(), Some("Open"));
    }

    #[test]
    fn test_type_change_correlated() {
        let histories = vec![history(
            "2024-01-02T00:00:00Z",
            vec![
                item("Sprint", "1", "2"),
                item(ISSUE_TYPE_FIELD, "Sub-task", "Story"),
            ],
        )];

        let events = extract_events(&histories, "Sprint", ValueKind::Raw);
        let change = events[0].type_change.as_ref().unwrap();

        assert!(change.leaves_subtask());
        assert!(!change.enters_subtask());
    }

    #[test]
    fn test_subtask_type_names() {
        assert!(is_subtask_type("Sub-task"));
        assert!(is_subtask_type("subtask"));
        assert!(!is_subtask_type("Story"));
    }

    #[test]
    fn test_sorted_histories_is_stable() {
        let histories = vec![
            history("2024-01-03T00:00:00Z", vec![item("status", "B", "C")]),
            history("2024-01-01T00:00:00Z", vec![item("status", "A", "B")]),
            history("2024-01-03T00:00:00Z", vec![item("status", "C", "D")]),
        ];

        let sorted = sorted_histories(&histories);
        let tos: Vec<_> = sorted
            .iter()
            .map(|h| h.items[0].to_string.clone().unwrap())
            .collect();

        assert_eq!(tos, vec!["B", "C", "D"]);
    }
}
