//! ---
//! obc_section: "05-command-line"
//! obc_subsection: "binary"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Command line entry point for OBC fault diagnosis."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, Subcommand};
use obc_common::{init_tracing, AppConfig, LogFormat, VersionInfo};
use tracing::info;

mod diagnose;
mod summary;

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "On-board charger fault diagnosis",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,

    /// Configuration file (falls back to OBC_DIAG_CONFIG, then obc-diag.toml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Console log format, overriding the configuration (json or pretty).
    #[arg(long, global = true, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Diagnose one telemetry file.
    Run(diagnose::RunCommand),
    /// Diagnose several telemetry files concurrently.
    Batch(diagnose::BatchCommand),
    /// Re-aggregate an existing diagnosis output file.
    Summary(summary::SummaryCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", VersionInfo::current().extended());
        return Ok(());
    }
    let command = cli
        .command
        .ok_or_else(|| anyhow!("no command given; see `obc-diag --help`"))?;

    let loaded = AppConfig::load_with_source(
        cli.config.as_deref(),
        &obc_common::config::DEFAULT_CANDIDATES,
    )?;
    let mut config = loaded.config;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    init_tracing("obc-diag", &config.logging)?;
    info!(
        version = %VersionInfo::current(),
        config = %loaded
            .source
            .as_ref()
            .map_or_else(|| "built-in defaults".to_owned(), |path| path.display().to_string()),
        "obc-diag starting"
    );

    match command {
        Commands::Run(cmd) => cmd.execute(&config),
        Commands::Batch(cmd) => cmd.execute(&config),
        Commands::Summary(cmd) => cmd.execute(),
    }
}
