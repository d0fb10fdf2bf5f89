//! Immutable lookup tables shared by every conversion in a sync run.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default cap on exploded array elements for additional fields.
pub const DEFAULT_ARRAY_LIMIT: usize = 50;

/// Normalized status: workflow category plus the source status name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Status {
    pub category: String,
    pub detail: String,
}

impl Status {
    #[must_use]
    pub fn new(category: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            detail: detail.into(),
        }
    }
}

/// Custom field id <-> display name mapping.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    name_by_id: HashMap<String, String>,
    ids_by_name: HashMap<String, Vec<String>>,
}

impl FieldCatalog {
    /// Build the catalog and its inverse from `(id, name)` pairs.
    ///
    /// Several ids may share one display name (Jira allows duplicates); the
    /// inverse keeps them sorted so lookups are deterministic.
    #[must_use]
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let name_by_id: HashMap<String, String> = pairs
            .into_iter()
            .map(|(id, name)| (id.into(), name.into()))
            .collect();

        let mut ids_by_name: HashMap<String, Vec<String>> = HashMap::new();
        for (id, name) in &name_by_id {
            ids_by_name.entry(name.clone()).or_default().push(id.clone());
        }
        for ids in ids_by_name.values_mut() {
            ids.sort();
        }

        Self {
            name_by_id,
            ids_by_name,
        }
    }

    #[must_use]
    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.name_by_id.get(id).map(String::as_str)
    }

    #[must_use]
    pub fn ids_of(&self, name: &str) -> &[String] {
        self.ids_by_name
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.name_by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name_by_id.is_empty()
    }
}

/// Status name -> [`Status`] lookup, keyed by normalized name.
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    by_name: HashMap<String, Status>,
}

impl StatusTable {
    #[must_use]
    pub fn new<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Status)>,
        K: AsRef<str>,
    {
        Self {
            by_name: entries
                .into_iter()
                .map(|(name, status)| (normalize_status_name(name.as_ref()), status))
                .collect(),
        }
    }

    /// Look up a raw status name; case and surrounding whitespace are ignored.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Status> {
        self.by_name.get(&normalize_status_name(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Normalize a status name for lookup.
#[must_use]
pub fn normalize_status_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Everything the assembler needs besides the raw issue itself.
///
/// Built once per sync run and shared read-only (typically behind an `Arc`).
#[derive(Debug, Clone)]
pub struct ReconstructionConfig {
    pub fields: FieldCatalog,
    pub statuses: StatusTable,
    /// Allowlisted custom field ids, in output order.
    pub additional_field_ids: Vec<String>,
    pub additional_fields_array_limit: usize,
    /// Jira site root used to build browse URLs.
    pub base_url: Option<String>,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            fields: FieldCatalog::default(),
            statuses: StatusTable::default(),
            additional_field_ids: Vec::new(),
            additional_fields_array_limit: DEFAULT_ARRAY_LIMIT,
            base_url: None,
        }
    }
}

impl ReconstructionConfig {
    /// Create a config from the two lookup tables with default extras.
    #[must_use]
    pub fn new(fields: FieldCatalog, statuses: StatusTable) -> Self {
        Self {
            fields,
            statuses,
            ..Default::default()
        }
    }

    /// Set the additional field allowlist (field ids).
    #[must_use]
    pub fn with_additional_fields(
        mut self,
        ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.additional_field_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn with_array_limit(mut self, limit: usize) -> Self {
        self.additional_fields_array_limit = limit;
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    /// Check internal consistency.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidConfig` if the array limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.additional_fields_array_limit == 0 {
            return Err(CoreError::InvalidConfig(
                "additional_fields_array_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Field ids whose display name is `Sprint`.
    #[must_use]
    pub fn sprint_field_ids(&self) -> &[String] {
        self.fields.ids_of(SPRINT_FIELD)
    }
}

/// Display name of the sprint custom field, both in the catalog and in
/// changelog items.
pub const SPRINT_FIELD: &str = "Sprint";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_catalog_inverse() {
        let catalog = FieldCatalog::new([
            ("customfield_10020", "Sprint"),
            ("customfield_10030", "Sprint"),
            ("customfield_10016", "Story Points"),
        ]);

        assert_eq!(catalog.name_of("customfield_10016"), Some("Story Points"));
        assert_eq!(
            catalog.ids_of("Sprint"),
            ["customfield_10020".to_string(), "customfield_10030".to_string()]
        );
        assert!(catalog.ids_of("Epic Link").is_empty());
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_status_lookup_is_normalized() {
        let table = StatusTable::new([("In Review", Status::new("InProgress", "In Review"))]);

        assert_eq!(
            table.resolve("  in review "),
            Some(&Status::new("InProgress", "In Review"))
        );
        assert!(table.resolve("Done").is_none());
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let config = ReconstructionConfig::default().with_array_limit(0);
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));
        assert!(ReconstructionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = ReconstructionConfig::default().with_base_url("https://acme.atlassian.net/");
        assert_eq!(config.base_url.as_deref(), Some("https://acme.atlassian.net"));
    }
}
