//! jirahist CLI - Reconstruct Jira issue histories from the command line.

mod commands;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jirahist")]
#[command(author, version, about = "Jira issue-history reconstruction")]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    format: output::OutputFormat,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct histories for raw issues in a file or directory
    Convert {
        /// JSON, NDJSON, search page, or a directory of those
        input: PathBuf,

        /// Run configuration (defaults to ./jirahist.yml if present)
        #[arg(long, short = 'c', env = "JIRAHIST_CONFIG")]
        config: Option<PathBuf>,

        /// Worker threads (defaults to available parallelism)
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
    },

    /// Validate a run configuration and summarize it
    CheckConfig {
        /// Run configuration (defaults to ./jirahist.yml)
        #[arg(long, short = 'c', env = "JIRAHIST_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Start the HTTP conversion server
    Serve {
        /// Run configuration (defaults to ./jirahist.yml if present)
        #[arg(long, short = 'c', env = "JIRAHIST_CONFIG")]
        config: Option<PathBuf>,

        /// Port to listen on
        #[arg(long, short = 'p', default_value = "17474")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet)?;

    match cli.command {
        Commands::Convert {
            input,
            config,
            jobs,
        } => commands::convert(&input, config.as_deref(), jobs, cli.format),
        Commands::CheckConfig { config } => commands::check_config(config.as_deref(), cli.format),
        Commands::Serve { config, port, host } => {
            commands::serve(config.as_deref(), &host, port)
        }
    }
}
