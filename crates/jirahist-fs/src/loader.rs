//! Raw issue loading.

use crate::error::{FsError, Result};
use jirahist_core::{decode_issues, RawIssue};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File extensions read as newline-delimited JSON.
const NDJSON_EXTENSIONS: &[&str] = &["ndjson", "jsonl"];
/// File extensions picked up when scanning a directory.
const INPUT_EXTENSIONS: &[&str] = &["json", "ndjson", "jsonl"];

/// Load raw issues from a file or, recursively, from a directory.
///
/// Directory entries are read in file-name order so runs are reproducible.
///
/// # Errors
/// Returns error if the path is missing or any file fails to parse.
pub fn load_issues(path: impl AsRef<Path>) -> Result<Vec<RawIssue>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(FsError::NotFound(path.to_path_buf()));
    }

    if !path.is_dir() {
        return load_file(path);
    }

    let mut issues = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), INPUT_EXTENSIONS) {
            continue;
        }
        issues.extend(load_file(entry.path())?);
    }

    info!(path = %path.display(), count = issues.len(), "Loaded issues");
    Ok(issues)
}

/// Load raw issues from one file.
///
/// Records that are not valid issues are logged and skipped; the rest of the
/// file still loads.
///
/// # Errors
/// Returns error if the file cannot be read, or a JSON file is not JSON.
pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<RawIssue>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    let values = if has_extension(path, NDJSON_EXTENSIONS) {
        parse_ndjson(path, &content)
    } else {
        parse_json(&content)?
    };
    let issues = decode_issues(values, &path.display().to_string());

    debug!(path = %path.display(), count = issues.len(), "Read issue file");
    Ok(issues)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

fn parse_ndjson(path: &Path, content: &str) -> Vec<Value> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match serde_json::from_str(line) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), line = idx + 1, error = %e, "Skipping unreadable line");
                None
            }
        })
        .collect()
}

/// A JSON array, a search response page, or a single issue.
fn parse_json(content: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(content)?;

    let values = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("issues") {
            Some(Value::Array(page)) => page,
            Some(other) => {
                obj.insert("issues".to_string(), other);
                vec![Value::Object(obj)]
            }
            None => vec![Value::Object(obj)],
        },
        other => vec![other],
    };

    Ok(values)
}
