//! Flattening of allowlisted custom fields into string pairs.

use crate::config::ReconstructionConfig;
use crate::error::{CoreError, Result};
use crate::raw::RawIssue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Object properties probed, in order, for a displayable value.
const VALUE_PROPS: [&str; 3] = ["value", "name", "displayName"];

/// Nesting followed before a value is rejected.
pub const MAX_DEPTH: usize = 8;

/// One flattened custom field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalField {
    pub name: String,
    pub value: String,
}

impl AdditionalField {
    fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Flattens custom field values for one issue.
#[derive(Debug, Clone, Copy)]
pub struct AdditionalFieldExtractor<'a> {
    array_limit: usize,
    issue_key: &'a str,
}

impl<'a> AdditionalFieldExtractor<'a> {
    #[must_use]
    pub const fn new(array_limit: usize, issue_key: &'a str) -> Self {
        Self {
            array_limit,
            issue_key,
        }
    }

    /// Extract every allowlisted field present on the issue.
    ///
    /// A field that fails to flatten is logged and skipped.
    #[must_use]
    pub fn extract_all(&self, raw: &RawIssue, config: &ReconstructionConfig) -> Vec<AdditionalField> {
        let mut out = Vec::new();

        for id in &config.additional_field_ids {
            let Some(value) = raw.field(id) else {
                continue;
            };
            let name = config.fields.name_of(id).unwrap_or(id);

            match self.extract(name, value) {
                Ok(fields) => out.extend(fields),
                Err(e) => {
                    warn!(issue = %self.issue_key, field = name, error = %e, "Skipping additional field");
                }
            }
        }

        out
    }

    /// Flatten one field value under `name`.
    ///
    /// Arrays are truncated to the configured limit; the base key carries the
    /// truncated array as JSON and each resolved element is exploded into
    /// `name_<i>`.
    ///
    /// # Errors
    /// Returns `CoreError::FieldTooDeep` for values nested beyond
    /// [`MAX_DEPTH`], or `CoreError::Json` if encoding fails.
    pub fn extract(&self, name: &str, value: &Value) -> Result<Vec<AdditionalField>> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => {
                let kept = &items[..items.len().min(self.array_limit)];
                let resolved = kept
                    .iter()
                    .map(|item| resolve(name, item, 0))
                    .collect::<Result<Vec<String>>>()?;

                let mut fields = Vec::with_capacity(resolved.len() + 1);
                fields.push(AdditionalField::new(name, serde_json::to_string(kept)?));
                fields.extend(
                    resolved
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| AdditionalField::new(format!("{name}_{i}"), v)),
                );
                Ok(fields)
            }
            other => Ok(vec![AdditionalField::new(name, resolve(name, other, 0)?)]),
        }
    }
}

/// Resolve a single value to display text.
fn resolve(name: &str, value: &Value, depth: usize) -> Result<String> {
    if depth > MAX_DEPTH {
        return Err(CoreError::FieldTooDeep {
            field: name.to_string(),
            limit: MAX_DEPTH,
        });
    }

    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Object(obj) => {
            // Cascading select: {"value": "High", "child": {"value": "Urgent"}}
            if let (Some(parent), Some(child)) = (obj.get("value"), obj.get("child")) {
                let parent = resolve(name, parent, depth + 1)?;
                let child = resolve(name, child, depth + 1)?;
                return Ok(format!("{parent} -> {child}"));
            }

            match VALUE_PROPS.iter().find_map(|prop| obj.get(*prop)) {
                Some(inner) => resolve(name, inner, depth + 1),
                None => Ok(serde_json::to_string(value)?),
            }
        }
        other => Ok(other.to_string()),
    }
}
