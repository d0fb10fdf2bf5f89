//! CLI command implementations.

use crate::output::{self, ConfigSummary, OutputFormat};
use anyhow::{anyhow, Context, Result};
use jirahist_core::{Issue, IssueAssembler, RawIssue};
use jirahist_fs::{load_issues, RunConfig, DEFAULT_CONFIG_FILE};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tracing::info;

/// Load the run configuration.
///
/// An explicit path must exist; without one, `./jirahist.yml` is used when
/// present and built-in defaults otherwise.
fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    if let Some(path) = path {
        return RunConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    let default = Path::new(DEFAULT_CONFIG_FILE);
    if default.exists() {
        return RunConfig::load(default).context("Failed to load ./jirahist.yml");
    }

    info!("No config file, using defaults");
    Ok(RunConfig::default())
}

/// Reconstruct every issue in `input` and print the results.
pub fn convert(
    input: &Path,
    config_path: Option<&Path>,
    jobs: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = config
        .to_reconstruction_config()
        .context("Invalid configuration")?;
    let assembler = IssueAssembler::new(Arc::new(engine));

    let raws = load_issues(input)
        .with_context(|| format!("Failed to load issues from {}", input.display()))?;

    let jobs = jobs
        .or_else(|| thread::available_parallelism().ok().map(NonZeroUsize::get))
        .unwrap_or(1);
    let issues = convert_all(&assembler, &raws, jobs)?;

    info!(count = issues.len(), jobs, "Converted issues");
    output::print_issues(&issues, format);
    Ok(())
}

/// Convert on up to `jobs` scoped worker threads, preserving input order.
fn convert_all(assembler: &IssueAssembler, raws: &[RawIssue], jobs: usize) -> Result<Vec<Issue>> {
    if raws.is_empty() {
        return Ok(Vec::new());
    }

    let chunk_size = raws.len().div_ceil(jobs.max(1));

    thread::scope(|scope| {
        let workers: Vec<_> = raws
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|raw| assembler.assemble(raw))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut issues = Vec::with_capacity(raws.len());
        for worker in workers {
            let converted = worker
                .join()
                .map_err(|_| anyhow!("Conversion worker panicked"))?;
            issues.extend(converted);
        }
        Ok(issues)
    })
}

/// Validate the configuration and print what the engine will use.
pub fn check_config(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let config = RunConfig::load(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    let engine = config
        .to_reconstruction_config()
        .context("Invalid configuration")?;

    output::print(&ConfigSummary::new(&config, &engine), format);
    Ok(())
}

/// Start the conversion server.
pub fn serve(config_path: Option<&Path>, host: &str, port: u16) -> Result<()> {
    let config = load_config(config_path)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async { jirahist_server::serve(&config, host, port).await })
}
