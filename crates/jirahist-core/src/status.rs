//! Status timeline reconstruction.

use crate::config::{Status, StatusTable};
use crate::event::{extract_events, ValueKind};
use crate::raw::RawHistory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Changelog field name for workflow status.
pub const STATUS_FIELD: &str = "status";

/// The issue entered `status` at `changed_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPoint {
    pub status: Status,
    pub changed_at: DateTime<Utc>,
}

/// Append a timeline point, replacing the previous one unless strictly later.
pub(crate) fn push_ascending<T>(
    points: &mut Vec<T>,
    point: T,
    at: impl Fn(&T) -> DateTime<Utc>,
) {
    if let Some(last) = points.last_mut() {
        if at(&point) <= at(&*last) {
            *last = point;
            return;
        }
    }
    points.push(point);
}

/// Reconstructs the status timeline of one issue.
#[derive(Debug, Clone, Copy)]
pub struct StatusTimelineBuilder<'a> {
    statuses: &'a StatusTable,
    issue_key: &'a str,
}

impl<'a> StatusTimelineBuilder<'a> {
    #[must_use]
    pub const fn new(statuses: &'a StatusTable, issue_key: &'a str) -> Self {
        Self {
            statuses,
            issue_key,
        }
    }

    /// Resolve a raw status name, falling back to the name itself.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Status {
        if let Some(status) = self.statuses.resolve(name) {
            return status.clone();
        }
        warn!(issue = %self.issue_key, status = name, "Unknown status, using name as category");
        Status::new(name, name)
    }

    /// Build ascending status points.
    ///
    /// The status held before the first recorded change is dated at
    /// `created`; without any change, `current` is dated at `created`.
    #[must_use]
    pub fn build(
        &self,
        histories: &[RawHistory],
        created: Option<DateTime<Utc>>,
        current: Option<&str>,
    ) -> Vec<StatusPoint> {
        let events = extract_events(histories, STATUS_FIELD, ValueKind::Display);
        let mut points = Vec::new();

        if events.is_empty() {
            if let (Some(created), Some(name)) = (created, current) {
                points.push(StatusPoint {
                    status: self.resolve(name),
                    changed_at: created,
                });
            }
            return points;
        }

        if let (Some(created), Some(initial)) = (created, events[0].from.as_deref()) {
            points.push(StatusPoint {
                status: self.resolve(initial),
                changed_at: created,
            });
        }

        for event in &events {
            let Some(name) = event.to.as_deref() else {
                continue;
            };
            let point = StatusPoint {
                status: self.resolve(name),
                changed_at: event.changed_at,
            };
            push_ascending(&mut points, point, |p| p.changed_at);
        }

        points
    }
}

/// Timestamp of the latest status point.
#[must_use]
pub fn status_changed(points: &[StatusPoint]) -> Option<DateTime<Utc>> {
    points.last().map(|p| p.changed_at)
}
