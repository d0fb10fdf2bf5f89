//! Sprint membership reconstruction.
//!
//! The Sprint field is list-valued and its audit items only carry the full
//! before/after id lists. Membership is recovered by folding those lists in
//! chronological order through a two-state machine:
//!
//! - `NoOpenInterval`: the issue is not attributed to any sprint.
//! - `OpenInterval(id)`: the issue entered sprint `id` at a known time.
//!
//! Each event is one of three transitions. A *normal diff* closes the open
//! interval and opens one for the single newly added id, or none when the
//! added set is empty or ambiguous. *Promote-to-subtask* closes the open
//! interval and opens nothing. *Demote-from-subtask* discards the open
//! interval unrecorded, since a sub-task's sprint is inherited from its
//! parent.

use crate::config::SPRINT_FIELD;
use crate::event::{extract_events, parse_timestamp, ChangeEvent, ValueKind};
use crate::error::{CoreError, Result};
use crate::raw::RawHistory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Jira sprint id.
pub type SprintId = u64;

/// A contiguous stretch of membership in one sprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintInterval {
    pub sprint_id: SprintId,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed_at: Option<DateTime<Utc>>,
}

/// Reconstructed sprint membership of one issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_sprint_id: Option<SprintId>,
    pub history: Vec<SprintInterval>,
}

/// A sprint as described by the issue's current snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSprint {
    pub id: SprintId,
    pub state: Option<String>,
    pub complete_date: Option<DateTime<Utc>>,
}

impl SnapshotSprint {
    fn is_active_or_future(&self) -> bool {
        self.state
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("active") || s.eq_ignore_ascii_case("future"))
    }

    /// Parse a Jira Server descriptor such as
    /// `com.atlassian.greenhopper.service.sprint.Sprint@1f[id=12,state=CLOSED,completeDate=...]`.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidSprint` when the brackets or the id are missing.
    pub fn parse_descriptor(input: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidSprint(input.to_string());

        let start = input.find('[').ok_or_else(invalid)?;
        let end = input.rfind(']').filter(|&end| end > start).ok_or_else(invalid)?;

        let attrs: HashMap<&str, &str> = input[start + 1..end]
            .split(',')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.trim(), v.trim()))
            .filter(|(_, v)| !v.is_empty() && *v != "<null>")
            .collect();

        let id = attrs
            .get("id")
            .and_then(|id| id.parse().ok())
            .ok_or_else(invalid)?;

        Ok(Self {
            id,
            state: attrs.get("state").map(|s| (*s).to_string()),
            complete_date: attrs
                .get("completeDate")
                .and_then(|d| parse_timestamp(d).ok()),
        })
    }

    /// Parse one element of the snapshot sprint field.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidSprint` for values carrying no usable id.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(obj) => {
                let id = obj
                    .get("id")
                    .and_then(|id| match id {
                        Value::Number(n) => n.as_u64(),
                        Value::String(s) => s.trim().parse().ok(),
                        _ => None,
                    })
                    .ok_or_else(|| CoreError::InvalidSprint(value.to_string()))?;

                Ok(Self {
                    id,
                    state: obj.get("state").and_then(Value::as_str).map(String::from),
                    complete_date: obj
                        .get("completeDate")
                        .and_then(Value::as_str)
                        .and_then(|d| parse_timestamp(d).ok()),
                })
            }
            Value::String(s) => s.trim().parse().map_or_else(
                |_| Self::parse_descriptor(s),
                |id| Ok(Self::bare(id)),
            ),
            Value::Number(n) => n
                .as_u64()
                .map(Self::bare)
                .ok_or_else(|| CoreError::InvalidSprint(value.to_string())),
            _ => Err(CoreError::InvalidSprint(value.to_string())),
        }
    }

    const fn bare(id: SprintId) -> Self {
        Self {
            id,
            state: None,
            complete_date: None,
        }
    }
}

/// Parse the snapshot sprint field, skipping malformed elements.
#[must_use]
pub fn parse_snapshot_sprints(value: &Value, issue_key: &str) -> Vec<SnapshotSprint> {
    let elements = match value {
        Value::Null => return Vec::new(),
        Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };

    elements
        .iter()
        .filter_map(|element| match SnapshotSprint::from_value(element) {
            Ok(sprint) => Some(sprint),
            Err(e) => {
                warn!(issue = %issue_key, error = %e, "Skipping malformed sprint value");
                None
            }
        })
        .collect()
}

/// Pick one sprint among equally plausible candidates.
///
/// Active or future sprints win, then the latest completion date. Candidates
/// unknown to the snapshot rank last; the highest id breaks remaining ties.
#[must_use]
pub fn tie_break(candidates: &[SprintId], snapshot: &[SnapshotSprint]) -> Option<SprintId> {
    candidates.iter().copied().max_by_key(|id| {
        let known = snapshot.iter().find(|s| s.id == *id);
        (
            known.is_some_and(SnapshotSprint::is_active_or_future),
            known.and_then(|s| s.complete_date),
            known.is_some(),
            *id,
        )
    })
}

/// Sprint ids in a comma-separated changelog value, in order, deduplicated.
fn parse_id_list(raw: Option<&str>, issue_key: &str) -> Vec<SprintId> {
    let mut ids = Vec::new();
    for token in raw.unwrap_or_default().split(',').map(str::trim) {
        if token.is_empty() {
            continue;
        }
        match token.parse::<SprintId>() {
            Ok(id) if !ids.contains(&id) => ids.push(id),
            Ok(_) => {}
            Err(_) => warn!(issue = %issue_key, value = token, "Skipping malformed sprint id"),
        }
    }
    ids
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    NoOpenInterval,
    OpenInterval {
        sprint_id: SprintId,
        added_at: DateTime<Utc>,
    },
}

impl Membership {
    fn close(self, at: DateTime<Utc>) -> Option<SprintInterval> {
        match self {
            Self::NoOpenInterval => None,
            Self::OpenInterval {
                sprint_id,
                added_at,
            } => Some(SprintInterval {
                sprint_id,
                added_at,
                removed_at: Some(at.max(added_at)),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    NormalDiff,
    PromoteToSubtask,
    DemoteFromSubtask,
}

impl Transition {
    fn classify(event: &ChangeEvent) -> Self {
        match &event.type_change {
            Some(change) if change.leaves_subtask() => Self::DemoteFromSubtask,
            Some(change) if change.enters_subtask() => Self::PromoteToSubtask,
            _ => Self::NormalDiff,
        }
    }
}

/// Accumulator of the left fold over sprint events.
#[derive(Debug, Clone)]
struct Fold {
    state: Membership,
    tracked: Vec<SprintId>,
    history: Vec<SprintInterval>,
}

/// Reconstructs sprint membership of one issue.
#[derive(Debug, Clone, Copy)]
pub struct SprintMembershipReconstructor<'a> {
    issue_key: &'a str,
}

impl<'a> SprintMembershipReconstructor<'a> {
    #[must_use]
    pub const fn new(issue_key: &'a str) -> Self {
        Self { issue_key }
    }

    /// Derive sprint membership from ascending audit entries and the
    /// snapshot's sprints.
    ///
    /// Returns `None` when there is nothing attributable: a sub-task whose
    /// sprint field never changed, or an issue with neither sprint events nor
    /// a dated snapshot sprint.
    #[must_use]
    pub fn reconstruct(
        &self,
        histories: &[RawHistory],
        created: Option<DateTime<Utc>>,
        is_subtask: bool,
        snapshot: &[SnapshotSprint],
    ) -> Option<SprintInfo> {
        let events = extract_events(histories, SPRINT_FIELD, ValueKind::Raw);

        let Some(first) = events.first() else {
            if is_subtask {
                return None;
            }
            return self.from_snapshot(created?, snapshot);
        };

        let seed = self.seed(first, created, snapshot);
        let folded = events
            .iter()
            .fold(seed, |acc, event| self.apply(acc, event));

        let mut history = folded.history;
        if let Membership::OpenInterval {
            sprint_id,
            added_at,
        } = folded.state
        {
            history.push(SprintInterval {
                sprint_id,
                added_at,
                removed_at: None,
            });
        }

        let history = dedup_latest(history);
        let current_sprint_id = history
            .iter()
            .find(|i| i.removed_at.is_none())
            .map(|i| i.sprint_id);

        Some(SprintInfo {
            current_sprint_id,
            history,
        })
    }

    fn from_snapshot(
        &self,
        created: DateTime<Utc>,
        snapshot: &[SnapshotSprint],
    ) -> Option<SprintInfo> {
        let ids: Vec<SprintId> = snapshot.iter().map(|s| s.id).collect();
        let sprint_id = tie_break(&ids, snapshot)?;

        debug!(issue = %self.issue_key, sprint_id, "Sprint taken from snapshot");
        Some(SprintInfo {
            current_sprint_id: Some(sprint_id),
            history: vec![SprintInterval {
                sprint_id,
                added_at: created,
                removed_at: None,
            }],
        })
    }

    /// Initial state from the sprints held before the first recorded change.
    fn seed(
        &self,
        first: &ChangeEvent,
        created: Option<DateTime<Utc>>,
        snapshot: &[SnapshotSprint],
    ) -> Fold {
        let tracked = parse_id_list(first.from.as_deref(), self.issue_key);

        let state = match tracked.as_slice() {
            [] => Membership::NoOpenInterval,
            [sprint_id] => Membership::OpenInterval {
                sprint_id: *sprint_id,
                added_at: created
                    .filter(|c| *c <= first.changed_at)
                    .unwrap_or(first.changed_at),
            },
            several => tie_break(several, snapshot).map_or(Membership::NoOpenInterval, |id| {
                Membership::OpenInterval {
                    sprint_id: id,
                    added_at: first.changed_at,
                }
            }),
        };

        Fold {
            state,
            tracked,
            history: Vec::new(),
        }
    }

    fn apply(&self, mut acc: Fold, event: &ChangeEvent) -> Fold {
        let at = event.changed_at;
        let new_ids = parse_id_list(event.to.as_deref(), self.issue_key);

        let state = match Transition::classify(event) {
            Transition::DemoteFromSubtask => Membership::NoOpenInterval,
            Transition::PromoteToSubtask => {
                acc.history.extend(acc.state.close(at));
                Membership::NoOpenInterval
            }
            Transition::NormalDiff => {
                acc.history.extend(acc.state.close(at));

                let added: Vec<SprintId> = new_ids
                    .iter()
                    .copied()
                    .filter(|id| !acc.tracked.contains(id))
                    .collect();

                match added.as_slice() {
                    [] => Membership::NoOpenInterval,
                    [sprint_id] => Membership::OpenInterval {
                        sprint_id: *sprint_id,
                        added_at: at,
                    },
                    _ => {
                        warn!(
                            issue = %self.issue_key,
                            added = ?added,
                            "Ambiguous sprint change, leaving membership unattributed"
                        );
                        Membership::NoOpenInterval
                    }
                }
            }
        };

        Fold {
            state,
            tracked: new_ids,
            history: acc.history,
        }
    }
}

/// Keep one interval per sprint: the one added last (later entries win ties).
fn dedup_latest(history: Vec<SprintInterval>) -> Vec<SprintInterval> {
    let mut latest: HashMap<SprintId, usize> = HashMap::new();
    for (idx, interval) in history.iter().enumerate() {
        match latest.get(&interval.sprint_id) {
            Some(&kept) if history[kept].added_at > interval.added_at => {}
            _ => {
                latest.insert(interval.sprint_id, idx);
            }
        }
    }

    history
        .into_iter()
        .enumerate()
        .filter(|(idx, interval)| latest.get(&interval.sprint_id) == Some(idx))
        .map(|(_, interval)| interval)
        .collect()
}
