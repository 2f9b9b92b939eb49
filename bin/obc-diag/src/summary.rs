//! ---
//! obc_section: "05-command-line"
//! obc_subsection: "binary"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "`summary` subcommand."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use obc_diag_core::FaultSummary;
use obc_diag_io::read_output_records;

#[derive(Debug, Args)]
pub struct SummaryCommand {
    /// Output CSV previously written by `obc-diag run` or `batch`.
    pub result: PathBuf,
}

impl SummaryCommand {
    pub fn execute(&self) -> Result<()> {
        let records = read_output_records(&self.result)
            .with_context(|| format!("unable to read {}", self.result.display()))?;
        let summary: FaultSummary = records.iter().collect();

        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &summary)?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
