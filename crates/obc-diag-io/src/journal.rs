//! ---
//! obc_section: "03-record-stream"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "JSON-lines journal of fault status transitions."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use obc_diag_core::{FaultCode, FaultStatus, FaultTransition, TransitionKind};
use serde::Serialize;

use crate::error::{Result, StreamError};

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    pub line: u64,
    pub cycle: u64,
    pub event: TransitionKind,
    pub code: FaultCode,
    pub name: &'static str,
    pub from: FaultStatus,
    pub to: FaultStatus,
}

impl JournalEntry {
    pub fn new(line: u64, transition: &FaultTransition) -> Self {
        Self {
            line,
            cycle: transition.cycle,
            event: transition.kind(),
            code: transition.code,
            name: transition.code.name(),
            from: transition.from,
            to: transition.to,
        }
    }
}

pub struct TransitionJournal {
    out: BufWriter<Box<dyn Write + Send>>,
    entries: u64,
}

impl TransitionJournal {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|source| StreamError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_writer(file))
    }

    pub fn from_writer<W: Write + Send + 'static>(output: W) -> Self {
        Self {
            out: BufWriter::new(Box::new(output)),
            entries: 0,
        }
    }

    pub fn append(&mut self, line: u64, transitions: &[FaultTransition]) -> Result<()> {
        for transition in transitions {
            serde_json::to_writer(&mut self.out, &JournalEntry::new(line, transition))?;
            self.out.write_all(b"\n")?;
            self.entries += 1;
        }
        Ok(())
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
