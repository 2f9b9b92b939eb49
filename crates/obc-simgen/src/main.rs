//! ---
//! obc_section: "04-simulation"
//! obc_subsection: "binary"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "CLI writing the canonical telemetry scenarios as CSV."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use obc_common::VersionInfo;
use obc_simgen::{write_samples, HeaderStyle, ScenarioKind};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HeaderArg {
    Canonical,
    Legacy,
}

impl From<HeaderArg> for HeaderStyle {
    fn from(value: HeaderArg) -> Self {
        match value {
            HeaderArg::Canonical => HeaderStyle::Canonical,
            HeaderArg::Legacy => HeaderStyle::Legacy,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Generate OBC telemetry scenarios for the fault diagnosis engine",
    long_about = None
)]
struct Cli {
    /// Scenario to generate (data1, data2, data3). All three when omitted.
    #[arg(long, value_parser = parse_kind)]
    scenario: Option<ScenarioKind>,

    /// Directory receiving `<scenario>.csv` files.
    #[arg(long, default_value = "rawdata")]
    output_dir: PathBuf,

    /// Write a single scenario to stdout instead of files.
    #[arg(long, action = ArgAction::SetTrue)]
    stdout: bool,

    /// Header spelling of the generated files.
    #[arg(long, value_enum, default_value_t = HeaderArg::Canonical)]
    header: HeaderArg,

    /// Print extended version information and exit
    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue)]
    version: bool,
}

fn parse_kind(value: &str) -> std::result::Result<ScenarioKind, String> {
    value
        .parse()
        .map_err(|_| format!("unknown scenario `{value}` (expected data1, data2 or data3)"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", VersionInfo::current().extended());
        return Ok(());
    }
    let style = HeaderStyle::from(cli.header);

    if cli.stdout {
        let kind = cli
            .scenario
            .ok_or_else(|| anyhow!("--stdout requires --scenario"))?;
        let scenario = kind.build();
        return write_samples(io::stdout().lock(), &scenario.samples, style);
    }

    fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("failed to create {}", cli.output_dir.display()))?;
    let kinds: Vec<ScenarioKind> = match cli.scenario {
        Some(kind) => vec![kind],
        None => ScenarioKind::all().collect(),
    };
    for kind in kinds {
        let scenario = kind.build();
        let path = cli.output_dir.join(scenario.file_name());
        let file = File::create(&path)
            .with_context(|| format!("failed to create output file {}", path.display()))?;
        write_samples(file, &scenario.samples, style)?;
        let targets: Vec<String> = kind.targets().iter().map(|code| code.to_string()).collect();
        eprintln!(
            "generated {} cycles -> {} (targets {})",
            scenario.samples.len(),
            path.display(),
            targets.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scenario_names() {
        assert_eq!(parse_kind("data1"), Ok(ScenarioKind::Data1));
        assert!(parse_kind("data4").is_err());
    }

    #[test]
    fn cli_defaults_generate_everything() {
        let cli = Cli::try_parse_from(["obc-simgen"]).unwrap();
        assert!(cli.scenario.is_none());
        assert_eq!(cli.output_dir, PathBuf::from("rawdata"));
        assert!(matches!(cli.header, HeaderArg::Canonical));
    }
}
