//! ---
//! obc_section: "06-testing"
//! obc_subsection: "test"
//! obc_type: "source"
//! obc_scope: "test"
//! obc_description: "File-level diagnosis runs over generated scenarios."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Result;
use obc_diag_core::{diagnose_all, FaultCode, FaultThresholds};
use obc_diag_io::{
    read_output_records, read_samples, run_batch, run_diagnosis, BatchOptions, StreamError,
};
use obc_simgen::{write_samples, HeaderStyle, ScenarioKind};
use tempfile::tempdir;

fn write_scenario(dir: &Path, kind: ScenarioKind, style: HeaderStyle) -> Result<PathBuf> {
    let scenario = kind.build();
    let path = dir.join(scenario.file_name());
    write_samples(File::create(&path)?, &scenario.samples, style)?;
    Ok(path)
}

#[test]
fn legacy_header_files_diagnose_like_in_memory_runs() -> Result<()> {
    let dir = tempdir()?;
    for kind in ScenarioKind::all() {
        let input = write_scenario(dir.path(), kind, HeaderStyle::Legacy)?;
        let samples = read_samples(&input)?;
        assert_eq!(samples, kind.build().samples);

        let output = dir.path().join(format!("{kind}_result.csv"));
        let report = run_diagnosis(&input, &output, &FaultThresholds::default(), None)?;
        let records = read_output_records(&output)?;
        assert_eq!(records, diagnose_all(FaultThresholds::default(), &samples)?);
        assert_eq!(report.cycles, records.len() as u64);
        for code in kind.targets() {
            assert!(report.summary.tally(code).ever_confirmed(), "{kind}: {code}");
        }
    }
    Ok(())
}

#[test]
fn journal_records_watchdog_confirmation_and_reset() -> Result<()> {
    let dir = tempdir()?;
    let input = write_scenario(dir.path(), ScenarioKind::Data3, HeaderStyle::Canonical)?;
    let output = dir.path().join("out.csv");
    let journal = dir.path().join("out.jsonl");

    let report = run_diagnosis(&input, &output, &FaultThresholds::default(), Some(&journal))?;
    assert_eq!(report.resets, 1);

    let entries: Vec<serde_json::Value> = std::fs::read_to_string(&journal)?
        .lines()
        .map(serde_json::from_str)
        .collect::<std::result::Result<_, _>>()?;
    assert_eq!(entries.len() as u64, report.transitions);

    let watchdog: Vec<_> = entries
        .iter()
        .filter(|entry| entry["code"] == FaultCode::Watchdog.code())
        .collect();
    assert_eq!(watchdog.len(), 2);
    assert_eq!(watchdog[0]["cycle"], 70);
    assert_eq!(watchdog[0]["event"], "CONFIRMED");
    assert_eq!(watchdog[1]["cycle"], 87);
    assert_eq!(watchdog[1]["event"], "CLEARED");
    Ok(())
}

#[test]
fn journal_records_repeated_cycle_as_watchdog_confirmation() -> Result<()> {
    let dir = tempdir()?;
    let mut samples = ScenarioKind::Data2.build().samples;
    let repeat = samples
        .iter()
        .position(|sample| sample.cycle == 40)
        .expect("cycle 40 present");
    let duplicate = samples[repeat].clone();
    samples.insert(repeat + 1, duplicate);

    let input = dir.path().join("repeated.csv");
    write_samples(File::create(&input)?, &samples, HeaderStyle::Canonical)?;
    let output = dir.path().join("repeated_result.csv");
    let journal = dir.path().join("repeated.jsonl");
    run_diagnosis(&input, &output, &FaultThresholds::default(), Some(&journal))?;

    let records = read_output_records(&output)?;
    assert_eq!(records.len(), samples.len());
    assert_eq!(records[repeat].status(FaultCode::Watchdog).as_u8(), 0);
    assert_eq!(records[repeat + 1].cycle, 40);
    assert_eq!(records[repeat + 1].status(FaultCode::Watchdog).as_u8(), 2);

    let entries: Vec<serde_json::Value> = std::fs::read_to_string(&journal)?
        .lines()
        .map(serde_json::from_str)
        .collect::<std::result::Result<_, _>>()?;
    let confirmed = entries
        .iter()
        .find(|entry| entry["code"] == FaultCode::Watchdog.code())
        .expect("watchdog entry");
    assert_eq!(confirmed["event"], "CONFIRMED");
    assert_eq!(confirmed["cycle"], 40);
    // Header is line 1, so the repeated row sits two lines past its index.
    assert_eq!(confirmed["line"], repeat as u64 + 3);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn batch_runs_all_scenarios_and_isolates_failures() -> Result<()> {
    let dir = tempdir()?;
    let mut inputs = Vec::new();
    for kind in ScenarioKind::all() {
        inputs.push(write_scenario(dir.path(), kind, HeaderStyle::Canonical)?);
    }
    inputs.push(dir.path().join("absent.csv"));

    let options = BatchOptions::new(dir.path().join("results"));
    std::fs::create_dir_all(&options.output_dir)?;
    let outcomes = run_batch(inputs.clone(), FaultThresholds::default(), options).await;

    assert_eq!(outcomes.len(), 4);
    for (outcome, input) in outcomes.iter().zip(&inputs) {
        assert_eq!(&outcome.input, input);
    }
    assert!(outcomes[..3].iter().all(|outcome| outcome.is_ok()));
    assert!(matches!(
        outcomes[3].result,
        Err(StreamError::Open { .. })
    ));
    Ok(())
}
