//! Run configuration.

use crate::error::{FsError, Result};
use jirahist_core::{
    normalize_status_name, FieldCatalog, ReconstructionConfig, Status, StatusTable, DEFAULT_ARRAY_LIMIT,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Configuration file looked up when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "jirahist.yml";

/// Run configuration stored in `jirahist.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Configuration version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Jira site settings.
    #[serde(default)]
    pub jira: JiraSettings,

    /// Field id -> display name.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,

    /// Known workflow statuses.
    #[serde(default)]
    pub statuses: Vec<StatusEntry>,

    /// Custom fields to flatten, by display name or id.
    #[serde(default)]
    pub additional_fields: Vec<String>,

    /// Cap on exploded array elements per additional field.
    #[serde(default = "default_array_limit")]
    pub additional_fields_array_limit: usize,

    /// HTTP service settings.
    #[serde(default)]
    pub server: ServerSettings,
}

fn default_version() -> u32 {
    1
}

fn default_array_limit() -> usize {
    DEFAULT_ARRAY_LIMIT
}

/// Jira site settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JiraSettings {
    /// Site root, e.g. `https://acme.atlassian.net`.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// A workflow status and its Jira status category key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    pub name: String,
    /// `new`, `indeterminate` or `done`; anything else is used verbatim.
    pub category: String,
}

/// HTTP service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Conversions allowed to run at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_conversions: usize,
}

fn default_max_concurrent() -> usize {
    8
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            max_concurrent_conversions: default_max_concurrent(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            version: 1,
            jira: JiraSettings::default(),
            fields: BTreeMap::new(),
            statuses: Vec::new(),
            additional_fields: Vec::new(),
            additional_fields_array_limit: DEFAULT_ARRAY_LIMIT,
            server: ServerSettings::default(),
        }
    }
}

/// Map a Jira status category key onto the normalized category.
#[must_use]
pub fn category_for(key: &str) -> String {
    match key.trim().to_lowercase().as_str() {
        "new" | "todo" | "to do" => "Todo".to_string(),
        "indeterminate" | "in progress" => "InProgress".to_string(),
        "done" => "Done".to_string(),
        _ => key.to_string(),
    }
}

impl RunConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    /// Returns error if the file is missing, malformed or invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FsError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;

        debug!(
            path = %path.display(),
            fields = config.fields.len(),
            statuses = config.statuses.len(),
            "Loaded config"
        );

        Ok(config)
    }

    /// Check the configuration for unusable values.
    ///
    /// # Errors
    /// Returns error on an unknown version, a zero limit or a blank status.
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(FsError::UnsupportedVersion(self.version));
        }
        if self.server.max_concurrent_conversions == 0 {
            return Err(FsError::InvalidConfig(
                "server.max_concurrent_conversions must be positive".to_string(),
            ));
        }
        if let Some(entry) = self.statuses.iter().find(|s| s.name.trim().is_empty()) {
            return Err(FsError::InvalidConfig(format!(
                "status with empty name (category '{}')",
                entry.category
            )));
        }
        Ok(())
    }

    /// Build the engine's lookup tables.
    ///
    /// Status details are stored in normalized form, the same form the table
    /// is keyed by.
    ///
    /// # Errors
    /// Returns error if the resulting tables are inconsistent.
    pub fn to_reconstruction_config(&self) -> Result<ReconstructionConfig> {
        let fields = FieldCatalog::new(self.fields.iter().map(|(id, name)| (id.as_str(), name.as_str())));
        let statuses = StatusTable::new(self.statuses.iter().map(|s| {
            let status = Status::new(category_for(&s.category), normalize_status_name(&s.name));
            (s.name.as_str(), status)
        }));

        let additional = self.resolve_additional_fields(&fields);

        let mut config = ReconstructionConfig::new(fields, statuses)
            .with_additional_fields(additional)
            .with_array_limit(self.additional_fields_array_limit);
        if let Some(base_url) = &self.jira.base_url {
            config = config.with_base_url(base_url.clone());
        }

        config.validate()?;
        Ok(config)
    }

    /// Turn configured names or ids into field ids, preserving order.
    ///
    /// Display names known to the catalog expand to their ids; any other
    /// entry is taken as a field id, which covers built-in fields such as
    /// `components`.
    fn resolve_additional_fields(&self, fields: &FieldCatalog) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();

        for entry in &self.additional_fields {
            let by_name = fields.ids_of(entry);
            let resolved: Vec<String> = if fields.name_of(entry).is_none() && !by_name.is_empty() {
                by_name.to_vec()
            } else {
                debug!(field = %entry, "Using additional field as id");
                vec![entry.clone()]
            };

            for id in resolved {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }

        ids
    }
}
