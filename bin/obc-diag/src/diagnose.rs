//! ---
//! obc_section: "05-command-line"
//! obc_subsection: "binary"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "`run` and `batch` subcommands."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args};
use obc_common::AppConfig;
use obc_diag_io::{run_batch, run_diagnosis, BatchOptions};
use serde::Serialize;

#[derive(Debug, Args)]
pub struct RunCommand {
    /// Telemetry CSV to diagnose.
    pub input: PathBuf,

    /// Output CSV receiving one status record per input cycle.
    pub output: PathBuf,

    /// Write fault transitions as JSON lines to this file.
    #[arg(long, value_name = "FILE")]
    pub journal: Option<PathBuf>,

    /// Print the run report (per-code tallies) as JSON on stdout.
    #[arg(long, action = ArgAction::SetTrue)]
    pub summary: bool,
}

impl RunCommand {
    pub fn execute(&self, config: &AppConfig) -> Result<()> {
        let report = run_diagnosis(
            &self.input,
            &self.output,
            &config.thresholds,
            self.journal.as_deref(),
        )
        .with_context(|| format!("diagnosis of {} failed", self.input.display()))?;

        if self.summary {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &report)?;
            stdout.write_all(b"\n")?;
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct BatchCommand {
    /// Telemetry CSV files to diagnose.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory receiving `<stem><suffix>.csv` outputs.
    #[arg(long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Also write a `<stem><suffix>.jsonl` transition journal per input.
    #[arg(long, action = ArgAction::SetTrue)]
    pub journal: bool,

    /// Override `batch.max_parallel` from the configuration.
    #[arg(long, value_name = "N")]
    pub max_parallel: Option<usize>,
}

#[derive(Debug, Serialize)]
struct BatchLine {
    input: String,
    output: Option<String>,
    cycles: Option<u64>,
    confirmed: Vec<String>,
    error: Option<String>,
}

impl BatchCommand {
    pub fn execute(&self, config: &AppConfig) -> Result<()> {
        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("unable to create {}", self.output_dir.display()))?;

        let options = BatchOptions {
            output_dir: self.output_dir.clone(),
            output_suffix: config.batch.output_suffix.clone(),
            max_parallel: self.max_parallel.unwrap_or(config.batch.max_parallel),
            journal: self.journal,
        };
        if options.max_parallel == 0 {
            return Err(anyhow!("--max-parallel must be at least 1"));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start batch runtime")?;
        let outcomes = runtime.block_on(run_batch(
            self.inputs.clone(),
            config.thresholds.clone(),
            options,
        ));

        let lines: Vec<BatchLine> = outcomes
            .iter()
            .map(|outcome| match &outcome.result {
                Ok(report) => BatchLine {
                    input: outcome.input.display().to_string(),
                    output: Some(report.output.display().to_string()),
                    cycles: Some(report.cycles),
                    confirmed: report
                        .summary
                        .confirmed_codes()
                        .map(|code| code.to_string())
                        .collect(),
                    error: None,
                },
                Err(err) => BatchLine {
                    input: outcome.input.display().to_string(),
                    output: None,
                    cycles: None,
                    confirmed: Vec::new(),
                    error: Some(err.to_string()),
                },
            })
            .collect();
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &lines)?;
        stdout.write_all(b"\n")?;

        let failed = outcomes.iter().filter(|outcome| !outcome.is_ok()).count();
        if failed > 0 {
            return Err(anyhow!("{failed} of {} inputs failed", outcomes.len()));
        }
        Ok(())
    }
}
