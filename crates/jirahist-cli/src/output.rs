//! Output formatting for the CLI.

use chrono::{DateTime, Utc};
use console::style;
use jirahist_core::{Issue, ReconstructionConfig, SprintInfo};
use jirahist_fs::RunConfig;
use serde::Serialize;
use std::fmt::Write;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

/// Print output in the specified format.
pub fn print<T: Serialize + HumanDisplay>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Human => println!("{}", value.human_display()),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(value).expect("Failed to serialize to JSON")
            );
        }
        OutputFormat::Yaml => {
            println!(
                "{}",
                serde_yaml::to_string(value).expect("Failed to serialize to YAML")
            );
        }
    }
}

/// Print reconstructed issues in the specified format.
pub fn print_issues(issues: &[Issue], format: OutputFormat) {
    match format {
        OutputFormat::Human => {
            if issues.is_empty() {
                println!("No issues found.");
                return;
            }
            for issue in issues {
                println!("{}", issue.human_display());
            }
            println!("{}", style(format!("Converted {} issue(s)", issues.len())).dim());
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(issues).expect("Failed to serialize to JSON")
            );
        }
        OutputFormat::Yaml => {
            println!(
                "{}",
                serde_yaml::to_string(issues).expect("Failed to serialize to YAML")
            );
        }
    }
}

/// Trait for human-readable display.
pub trait HumanDisplay {
    fn human_display(&self) -> String;
}

impl HumanDisplay for Issue {
    fn human_display(&self) -> String {
        let mut out = String::new();

        writeln!(out, "{}", style(&self.key).bold()).unwrap();
        if let Some(summary) = &self.summary {
            writeln!(out, "Summary:   {summary}").unwrap();
        }
        if let Some(issue_type) = &self.issue_type {
            writeln!(out, "Type:      {}", issue_type.name).unwrap();
        }
        if let Some(status) = &self.status {
            writeln!(out, "Status:    {} ({})", status.detail, status.category).unwrap();
        }
        if let Some(created) = &self.created {
            writeln!(out, "Created:   {}", format_time(created)).unwrap();
        }
        if let Some(url) = &self.url {
            writeln!(out, "URL:       {url}").unwrap();
        }

        if !self.status_changelog.is_empty() {
            writeln!(out, "Status history:").unwrap();
            for point in &self.status_changelog {
                writeln!(
                    out,
                    "  [{}] {} ({})",
                    format_time(&point.changed_at),
                    point.status.detail,
                    point.status.category
                )
                .unwrap();
            }
        }

        if !self.assignees.is_empty() {
            writeln!(out, "Assignees:").unwrap();
            for point in &self.assignees {
                writeln!(out, "  [{}] {}", format_time(&point.assigned_at), point.uid).unwrap();
            }
        }

        if let Some(info) = &self.sprint_info {
            write_sprints(&mut out, info);
        }

        if !self.key_changelog.is_empty() {
            writeln!(out, "Key changes:").unwrap();
            for change in &self.key_changelog {
                writeln!(
                    out,
                    "  [{}] {} → {}",
                    format_time(&change.changed_at),
                    change.old_key,
                    change.new_key
                )
                .unwrap();
            }
        }

        if !self.additional_fields.is_empty() {
            writeln!(out, "Fields:").unwrap();
            for field in &self.additional_fields {
                writeln!(out, "  {}: {}", field.name, field.value).unwrap();
            }
        }

        out
    }
}

fn write_sprints(out: &mut String, info: &SprintInfo) {
    writeln!(out, "Sprints:").unwrap();
    for interval in &info.history {
        let removed = interval
            .removed_at
            .as_ref()
            .map_or_else(|| "now".to_string(), format_time);
        let marker = if info.current_sprint_id == Some(interval.sprint_id) {
            " (current)"
        } else {
            ""
        };
        writeln!(
            out,
            "  {}: {} → {removed}{marker}",
            interval.sprint_id,
            format_time(&interval.added_at)
        )
        .unwrap();
    }
}

fn format_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// What the engine will use for a given configuration.
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub fields: usize,
    pub statuses: usize,
    pub sprint_fields: Vec<String>,
    pub additional_fields: Vec<String>,
    pub additional_fields_array_limit: usize,
    pub base_url: Option<String>,
    pub max_concurrent_conversions: usize,
}

impl ConfigSummary {
    #[must_use]
    pub fn new(config: &RunConfig, engine: &ReconstructionConfig) -> Self {
        Self {
            fields: engine.fields.len(),
            statuses: engine.statuses.len(),
            sprint_fields: engine.sprint_field_ids().to_vec(),
            additional_fields: engine.additional_field_ids.clone(),
            additional_fields_array_limit: engine.additional_fields_array_limit,
            base_url: engine.base_url.clone(),
            max_concurrent_conversions: config.server.max_concurrent_conversions,
        }
    }
}

impl HumanDisplay for ConfigSummary {
    fn human_display(&self) -> String {
        let mut out = String::new();

        writeln!(out, "{}", style("  ✓ Configuration is valid").green().bold()).unwrap();
        writeln!(out, "Fields:            {}", self.fields).unwrap();
        writeln!(out, "Statuses:          {}", self.statuses).unwrap();
        writeln!(out, "Sprint fields:     {}", join_or_dash(&self.sprint_fields)).unwrap();
        writeln!(out, "Additional fields: {}", join_or_dash(&self.additional_fields)).unwrap();
        writeln!(out, "Array limit:       {}", self.additional_fields_array_limit).unwrap();
        writeln!(
            out,
            "Base URL:          {}",
            self.base_url.as_deref().unwrap_or("-")
        )
        .unwrap();
        writeln!(out, "Max concurrent:    {}", self.max_concurrent_conversions).unwrap();

        out
    }
}

fn join_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}
