//! ---
//! obc_section: "03-record-stream"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Single-stream diagnosis pipeline."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use obc_diag_core::{DiagnosticEngine, FaultSummary, FaultThresholds};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, StreamError};
use crate::journal::TransitionJournal;
use crate::reader::SampleReader;
use crate::writer::RecordWriter;

/// Outcome of one diagnosed file.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub cycles: u64,
    pub transitions: u64,
    pub resets: u64,
    pub summary: FaultSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub cycles: u64,
    pub transitions: u64,
    pub resets: u64,
}

/// Drive `engine` over every sample of `samples`, writing one output record
/// per input record. On a malformed record the records already produced are
/// flushed before the error is returned.
pub fn diagnose_stream<R: Read, W: Write>(
    engine: &mut DiagnosticEngine,
    samples: &mut SampleReader<R>,
    writer: &mut RecordWriter<W>,
    mut journal: Option<&mut TransitionJournal>,
    summary: &mut FaultSummary,
) -> Result<StreamStats> {
    let mut stats = StreamStats::default();
    while let Some(next) = samples.next_sample() {
        let sample = match next {
            Ok(sample) => sample,
            Err(err) => {
                writer.flush()?;
                if let Some(journal) = journal.as_deref_mut() {
                    journal.flush()?;
                }
                return Err(err);
            }
        };

        let outcome = engine.step(&sample);
        writer.write(&outcome.record)?;
        summary.record(&outcome.record);
        if let Some(journal) = journal.as_deref_mut() {
            journal.append(samples.line(), &outcome.transitions)?;
        }

        stats.cycles += 1;
        stats.transitions += outcome.transitions.len() as u64;
        if outcome.reset_applied {
            stats.resets += 1;
        }
    }

    writer.flush()?;
    if let Some(journal) = journal {
        journal.flush()?;
    }
    Ok(stats)
}

/// Creating `target` would truncate `input` when both name the same file.
fn refuse_overwrite(input: &Path, target: &Path) -> Result<()> {
    if target.exists() && fs::canonicalize(input)? == fs::canonicalize(target)? {
        return Err(StreamError::OverwritesInput(target.to_path_buf()));
    }
    Ok(())
}

/// Diagnose `input` into `output`, optionally journaling transitions.
pub fn run_diagnosis(
    input: &Path,
    output: &Path,
    thresholds: &FaultThresholds,
    journal: Option<&Path>,
) -> Result<DiagnosisReport> {
    let mut engine = DiagnosticEngine::new(thresholds.clone())?;
    let mut samples = SampleReader::open(input)?;
    refuse_overwrite(input, output)?;
    if let Some(journal) = journal {
        refuse_overwrite(input, journal)?;
    }
    let mut writer = RecordWriter::create(output)?;
    let mut journal = journal.map(TransitionJournal::create).transpose()?;
    let mut summary = FaultSummary::new();

    let stats = diagnose_stream(
        &mut engine,
        &mut samples,
        &mut writer,
        journal.as_mut(),
        &mut summary,
    )
    .inspect_err(|err| {
        warn!(input = %input.display(), error = %err, "diagnosis aborted");
    })?;

    if stats.cycles == 0 {
        info!(input = %input.display(), "input holds no samples; wrote header only");
    }
    let confirmed: Vec<String> = summary
        .confirmed_codes()
        .map(|code| code.to_string())
        .collect();
    info!(
        input = %input.display(),
        output = %output.display(),
        cycles = stats.cycles,
        transitions = stats.transitions,
        ?confirmed,
        "diagnosis completed"
    );

    Ok(DiagnosisReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        generated_at: Utc::now(),
        cycles: stats.cycles,
        transitions: stats.transitions,
        resets: stats.resets,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::read_output_records;
    use anyhow::Result;
    use obc_diag_core::{FaultCode, FaultStatus};
    use std::fs;
    use tempfile::tempdir;

    const HEADER: &str = "Cycle,SeqState,PlugInfo,FLAG_Stop,FLAG_Relay,Ia,Ib,Ic,FaultState,Charg_Cnt,RealBatteryVoltage,ExpectedBatteryVoltage,H,CanMsgReceived,IsoR";

    fn row(cycle: u64, relay: u8) -> String {
        format!("{cycle},2,2,0,{relay},16,16,16,0,{cycle},4000,4000,25,1,800000")
    }

    #[test]
    fn writes_one_record_per_sample() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("input.csv");
        let output = dir.path().join("output.csv");
        let journal = dir.path().join("journal.jsonl");
        let body: Vec<String> = vec![row(1, 1), row(2, 0), row(3, 1)];
        fs::write(&input, format!("{HEADER}\n{}\n", body.join("\n")))?;

        let report = run_diagnosis(&input, &output, &FaultThresholds::default(), Some(&journal))?;
        assert_eq!(report.cycles, 3);
        assert_eq!(report.transitions, 1);

        let records = read_output_records(&output)?;
        let relay: Vec<FaultStatus> = records
            .iter()
            .map(|record| record.status(FaultCode::RelayFault))
            .collect();
        assert_eq!(
            relay,
            vec![FaultStatus::Clear, FaultStatus::Confirmed, FaultStatus::Confirmed]
        );
        let journal = fs::read_to_string(&journal)?;
        assert_eq!(journal.lines().count(), 1);
        assert!(journal.contains("\"line\":3"));
        Ok(())
    }

    #[test]
    fn output_naming_the_input_is_refused() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("input.csv");
        let contents = format!("{HEADER}\n{}\n{}\n", row(1, 1), row(2, 1));
        fs::write(&input, &contents)?;

        let aliased = dir.path().join(".").join("input.csv");
        let err = run_diagnosis(&input, &aliased, &FaultThresholds::default(), None).unwrap_err();
        assert!(matches!(err, StreamError::OverwritesInput(_)), "{err}");

        let output = dir.path().join("output.csv");
        let err = run_diagnosis(&input, &output, &FaultThresholds::default(), Some(&input))
            .unwrap_err();
        assert!(matches!(err, StreamError::OverwritesInput(_)), "{err}");
        assert!(!output.exists());

        assert_eq!(fs::read_to_string(&input)?, contents);
        Ok(())
    }

    #[test]
    fn empty_input_produces_header_only() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("empty.csv");
        let output = dir.path().join("empty_result.csv");
        fs::write(&input, "")?;

        let report = run_diagnosis(&input, &output, &FaultThresholds::default(), None)?;
        assert_eq!(report.cycles, 0);
        let text = fs::read_to_string(&output)?;
        assert!(text.starts_with("Cycle,F_0x01"));
        assert_eq!(text.lines().count(), 1);
        Ok(())
    }

    #[test]
    fn malformed_record_keeps_prior_output() -> Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("broken.csv");
        let output = dir.path().join("broken_result.csv");
        fs::write(
            &input,
            format!("{HEADER}\n{}\n{}\n5,2,2,0,1,x,16,16,0,5,4000,4000,25,1,800000\n", row(1, 1), row(2, 1)),
        )?;

        let err = run_diagnosis(&input, &output, &FaultThresholds::default(), None).unwrap_err();
        assert!(matches!(err, StreamError::MalformedRecord { line: 4, cycle: Some(5), .. }));
        assert_eq!(read_output_records(&output)?.len(), 2);
        Ok(())
    }

    #[test]
    fn missing_input_is_an_open_error() {
        let dir = tempdir().unwrap();
        let err = run_diagnosis(
            &dir.path().join("absent.csv"),
            &dir.path().join("out.csv"),
            &FaultThresholds::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, StreamError::Open { .. }));
    }
}
