//! jirahist-core: Reconstruction of temporal issue history from Jira audit logs.
//!
//! This crate provides:
//! - `RawIssue`: The issue payload as fetched with `expand=changelog`
//! - `ReconstructionConfig`: Immutable field and status lookup tables
//! - Timeline builders for status, assignee and sprint membership
//! - `IssueAssembler`: One reconstructed `Issue` per raw issue
//!
//! Everything here is synchronous and pure; a malformed issue degrades to a
//! partial `Issue` with logged warnings instead of an error.

pub mod adf;
pub mod assemble;
pub mod assignee;
pub mod config;
pub mod error;
pub mod event;
pub mod fields;
pub mod issue;
pub mod raw;
pub mod sprint;
pub mod status;

pub use assemble::{assemble_issue, IssueAssembler};
pub use assignee::{build_assignee_timeline, AssigneePoint};
pub use config::{
    normalize_status_name, FieldCatalog, ReconstructionConfig, Status, StatusTable, DEFAULT_ARRAY_LIMIT,
};
pub use error::{CoreError, Result};
pub use event::{extract_events, parse_timestamp, ChangeEvent, TypeChange, ValueKind};
pub use fields::{AdditionalField, AdditionalFieldExtractor};
pub use issue::{Dependency, Issue, IssueType, KeyChange};
pub use raw::{decode_issues, RawChangeItem, RawChangelog, RawHistory, RawIssue};
pub use sprint::{SnapshotSprint, SprintId, SprintInfo, SprintInterval, SprintMembershipReconstructor};
pub use status::{StatusPoint, StatusTimelineBuilder};
