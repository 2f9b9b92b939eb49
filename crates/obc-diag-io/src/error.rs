//! ---
//! obc_section: "03-record-stream"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Record stream error types."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use std::io;
use std::path::PathBuf;

use obc_diag_core::DiagnosticError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreamError>;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("unable to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column `{0}`")]
    MissingColumn(String),
    #[error("malformed record at line {line}{}: {reason}", describe_cycle(.cycle))]
    MalformedRecord {
        line: u64,
        cycle: Option<u64>,
        reason: String,
    },
    #[error("journal serialization error: {0}")]
    Journal(#[from] serde_json::Error),
    #[error(transparent)]
    Diagnosis(#[from] DiagnosticError),
    #[error("output {} is produced by more than one input", .0.display())]
    OutputCollision(PathBuf),
    #[error("refusing to overwrite input {}", .0.display())]
    OverwritesInput(PathBuf),
    #[error("diagnosis task failed: {0}")]
    Task(String),
}

fn describe_cycle(cycle: &Option<u64>) -> String {
    match cycle {
        Some(cycle) => format!(" (cycle {cycle})"),
        None => String::new(),
    }
}

impl StreamError {
    /// Cycle id of the offending record, when it could be decoded.
    pub fn cycle(&self) -> Option<u64> {
        match self {
            StreamError::MalformedRecord { cycle, .. } => *cycle,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_record_names_line_and_cycle() {
        let err = StreamError::MalformedRecord {
            line: 7,
            cycle: Some(6),
            reason: "invalid SeqState value 9 (expected 0..=4)".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed record at line 7 (cycle 6): invalid SeqState value 9 (expected 0..=4)"
        );
        assert_eq!(err.cycle(), Some(6));

        let err = StreamError::MalformedRecord {
            line: 3,
            cycle: None,
            reason: "bad".into(),
        };
        assert_eq!(err.to_string(), "malformed record at line 3: bad");
    }
}
