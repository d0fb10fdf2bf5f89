//! Assignee timeline reconstruction.

use crate::event::{extract_events, ValueKind};
use crate::raw::RawHistory;
use crate::status::push_ascending;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Changelog field name for the assignee.
pub const ASSIGNEE_FIELD: &str = "assignee";

/// The issue was assigned to `uid` at `assigned_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneePoint {
    pub uid: String,
    pub assigned_at: DateTime<Utc>,
}

/// Build ascending assignee points from raw account ids.
///
/// Same shape as the status timeline: the first change's previous assignee
/// is dated at `created`, and without changes the current assignee is.
/// Unassignments add no point.
#[must_use]
pub fn build_assignee_timeline(
    histories: &[RawHistory],
    created: Option<DateTime<Utc>>,
    current: Option<&str>,
) -> Vec<AssigneePoint> {
    let events = extract_events(histories, ASSIGNEE_FIELD, ValueKind::Raw);
    let mut points = Vec::new();

    let initial = if events.is_empty() {
        current
    } else {
        events[0].from.as_deref()
    };
    if let (Some(created), Some(uid)) = (created, initial) {
        points.push(AssigneePoint {
            uid: uid.to_string(),
            assigned_at: created,
        });
    }

    for event in events {
        let Some(uid) = event.to else {
            continue;
        };
        let point = AssigneePoint {
            uid,
            assigned_at: event.changed_at,
        };
        push_ascending(&mut points, point, |p| p.assigned_at);
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawChangeItem;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()
    }

    fn reassign(at: DateTime<Utc>, from: Option<&str>, to: Option<&str>) -> RawHistory {
        RawHistory {
            created: at.to_rfc3339(),
            items: vec![RawChangeItem {
                field: ASSIGNEE_FIELD.to_string(),
                from: from.map(String::from),
                to: to.map(String::from),
                from_string: from.map(|s| format!("User {s}")),
                to_string: to.map(|s| format!("User {s}")),
            }],
        }
    }

    #[test]
    fn test_reassignments() {
        let histories = vec![
            reassign(ts(2), Some("acc-1"), Some("acc-2")),
            reassign(ts(5), Some("acc-2"), None),
            reassign(ts(7), None, Some("acc-3")),
        ];

        let points = build_assignee_timeline(&histories, Some(ts(1)), Some("acc-3"));

        assert_eq!(
            points,
            vec![
                AssigneePoint {
                    uid: "acc-1".to_string(),
                    assigned_at: ts(1),
                },
                AssigneePoint {
                    uid: "acc-2".to_string(),
                    assigned_at: ts(2),
                },
                AssigneePoint {
                    uid: "acc-3".to_string(),
                    assigned_at: ts(7),
                },
            ]
        );
    }

    #[test]
    fn test_initially_unassigned() {
        let histories = vec![reassign(ts(2), None, Some("acc-9"))];
        let points = build_assignee_timeline(&histories, Some(ts(1)), Some("acc-9"));

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].assigned_at, ts(2));
    }

    #[test]
    fn test_current_assignee_without_changes() {
        let points = build_assignee_timeline(&[], Some(ts(1)), Some("acc-1"));
        assert_eq!(points[0].uid, "acc-1");
        assert_eq!(points[0].assigned_at, ts(1));

        assert!(build_assignee_timeline(&[], Some(ts(1)), None).is_empty());
    }
}
