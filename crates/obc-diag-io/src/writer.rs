//! ---
//! obc_section: "03-record-stream"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Diagnosis output CSV writer and reader."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, Trim, WriterBuilder};
use obc_diag_core::{FaultCode, FaultStatus, OutputRecord, FAULT_COUNT};

use crate::error::{Result, StreamError};

/// Writes `Cycle,F_0x01..F_0x0C` rows. The header is written on creation,
/// so an empty run still produces a valid file.
pub struct RecordWriter<W: Write> {
    writer: csv::Writer<W>,
    written: u64,
}

impl RecordWriter<File> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|source| StreamError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_writer(file)
    }
}

impl<W: Write> RecordWriter<W> {
    pub fn from_writer(output: W) -> Result<Self> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(output);
        writer.write_record(OutputRecord::header())?;
        Ok(Self { writer, written: 0 })
    }

    pub fn write(&mut self, record: &OutputRecord) -> Result<()> {
        self.writer.write_record(record.to_fields())?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the number of records written.
    pub fn finish(mut self) -> Result<u64> {
        self.flush()?;
        Ok(self.written)
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| StreamError::Io(err.into_error()))
    }
}

/// Parse a previously written output file back into records.
pub fn read_output_records(path: &Path) -> Result<Vec<OutputRecord>> {
    let file = File::open(path).map_err(|source| StreamError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_output(file)
}

pub fn parse_output<R: Read>(input: R) -> Result<Vec<OutputRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(input);
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Ok(Vec::new());
    }

    let cycle_column = headers
        .iter()
        .position(|header| header == "Cycle")
        .ok_or_else(|| StreamError::MissingColumn("Cycle".into()))?;
    let mut columns = [0usize; FAULT_COUNT];
    for code in FaultCode::all() {
        columns[code.index()] = headers
            .iter()
            .position(|header| FaultCode::from_column(header) == Some(code))
            .ok_or_else(|| StreamError::MissingColumn(code.column().into()))?;
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map_or(0, |position| position.line());
        let malformed = |cycle: Option<u64>, reason: String| StreamError::MalformedRecord {
            line,
            cycle,
            reason,
        };

        let cycle_field = row.get(cycle_column).unwrap_or_default();
        let cycle: u64 = cycle_field
            .parse()
            .map_err(|_| malformed(None, format!("invalid Cycle value `{cycle_field}`")))?;

        let mut statuses = [FaultStatus::Clear; FAULT_COUNT];
        for code in FaultCode::all() {
            let field = row.get(columns[code.index()]).unwrap_or_default();
            statuses[code.index()] = field
                .parse::<u8>()
                .ok()
                .and_then(|raw| FaultStatus::try_from(raw).ok())
                .ok_or_else(|| {
                    malformed(
                        Some(cycle),
                        format!("invalid {} status `{field}` (expected 0..=2)", code.column()),
                    )
                })?;
        }
        records.push(OutputRecord::new(cycle, statuses));
    }
    Ok(records)
}
