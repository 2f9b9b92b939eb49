//! ---
//! obc_section: "03-record-stream"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Concurrent multi-file diagnosis."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
//! Each input file gets its own engine on a blocking task. Files share no
//! state, so the only coordination is the permit count bounding how many
//! run at once.
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use obc_diag_core::FaultThresholds;
use tokio::sync::Semaphore;
use tokio::task;
use tracing::{error, info};

use crate::error::{Result, StreamError};
use crate::pipeline::{run_diagnosis, DiagnosisReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    pub output_suffix: String,
    pub max_parallel: usize,
    pub journal: bool,
}

impl BatchOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            output_suffix: "_result".into(),
            max_parallel: 4,
            journal: false,
        }
    }

    /// `<output_dir>/<stem><suffix>.csv`
    pub fn output_path(&self, input: &Path) -> PathBuf {
        self.sibling(input, "csv")
    }

    /// `<output_dir>/<stem><suffix>.jsonl`
    pub fn journal_path(&self, input: &Path) -> PathBuf {
        self.sibling(input, "jsonl")
    }

    fn sibling(&self, input: &Path, extension: &str) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".into());
        self.output_dir
            .join(format!("{stem}{}.{extension}", self.output_suffix))
    }
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub input: PathBuf,
    pub result: Result<DiagnosisReport>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Diagnose every input concurrently. Outcomes come back in input order and
/// a failing file never cancels the others.
pub async fn run_batch(
    inputs: Vec<PathBuf>,
    thresholds: FaultThresholds,
    options: BatchOptions,
) -> Vec<BatchOutcome> {
    let permits = Arc::new(Semaphore::new(options.max_parallel.max(1)));
    let thresholds = Arc::new(thresholds);
    let options = Arc::new(options);
    let mut claimed = HashSet::new();
    let mut handles = Vec::with_capacity(inputs.len());

    for input in inputs {
        let output = options.output_path(&input);
        if !claimed.insert(output.clone()) {
            handles.push((input, None));
            continue;
        }
        let permits = Arc::clone(&permits);
        let thresholds = Arc::clone(&thresholds);
        let options = Arc::clone(&options);
        let job_input = input.clone();
        let handle = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|err| StreamError::Task(err.to_string()))?;
            task::spawn_blocking(move || {
                let journal = options.journal.then(|| options.journal_path(&job_input));
                run_diagnosis(&job_input, &output, &thresholds, journal.as_deref())
            })
            .await
            .map_err(|err| StreamError::Task(err.to_string()))?
        });
        handles.push((input, Some(handle)));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (input, handle) in handles {
        let result = match handle {
            None => Err(StreamError::OutputCollision(options.output_path(&input))),
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(err) => Err(StreamError::Task(err.to_string())),
            },
        };
        match &result {
            Ok(report) => info!(
                input = %input.display(),
                output = %report.output.display(),
                cycles = report.cycles,
                "batch item completed"
            ),
            Err(err) => error!(input = %input.display(), error = %err, "batch item failed"),
        }
        outcomes.push(BatchOutcome { input, result });
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    const HEADER: &str = "Cycle,SeqState,PlugInfo,FLAG_Stop,FLAG_Relay,Ia,Ib,Ic,FaultState,Charg_Cnt,RealBatteryVoltage,ExpectedBatteryVoltage,H,CanMsgReceived,IsoR";

    #[test]
    fn output_names_follow_input_stem() {
        let options = BatchOptions::new("/tmp/out");
        assert_eq!(
            options.output_path(Path::new("/data/rawdata1.csv")),
            PathBuf::from("/tmp/out/rawdata1_result.csv")
        );
        assert_eq!(
            options.journal_path(Path::new("rawdata1.csv")),
            PathBuf::from("/tmp/out/rawdata1_result.jsonl")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn one_failure_does_not_cancel_the_rest() -> Result<()> {
        let dir = tempdir()?;
        let good = dir.path().join("good.csv");
        let bad = dir.path().join("bad.csv");
        let missing = dir.path().join("missing.csv");
        fs::write(&good, format!("{HEADER}\n1,2,2,0,1,16,16,16,0,1,4000,4000,25,1,800000\n"))?;
        fs::write(&bad, format!("{HEADER}\n1,9,2,0,1,16,16,16,0,1,4000,4000,25,1,800000\n"))?;

        let out = dir.path().join("out");
        fs::create_dir_all(&out)?;
        let mut options = BatchOptions::new(&out);
        options.max_parallel = 1;
        options.journal = true;

        let outcomes = run_batch(
            vec![good.clone(), bad, missing],
            FaultThresholds::default(),
            options,
        )
        .await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert_eq!(outcomes[0].input, good);
        assert!(matches!(outcomes[1].result, Err(StreamError::MalformedRecord { .. })));
        assert!(matches!(outcomes[2].result, Err(StreamError::Open { .. })));
        assert!(out.join("good_result.csv").exists());
        assert!(out.join("good_result.jsonl").exists());
        Ok(())
    }

    #[tokio::test]
    async fn colliding_outputs_are_rejected() -> Result<()> {
        let dir = tempdir()?;
        let first = dir.path().join("a").join("run.csv");
        let second = dir.path().join("b").join("run.csv");
        for path in [&first, &second] {
            fs::create_dir_all(path.parent().expect("parent"))?;
            fs::write(path, format!("{HEADER}\n"))?;
        }
        let outcomes = run_batch(
            vec![first, second],
            FaultThresholds::default(),
            BatchOptions::new(dir.path()),
        )
        .await;
        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1].result, Err(StreamError::OutputCollision(_))));
        Ok(())
    }
}
