//! ---
//! obc_section: "03-record-stream"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Sequential CSV telemetry sample reader."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
//! Samples are yielded in file order. Nothing is sorted or buffered beyond
//! the current row, so the watchdog sees the cycle deltas as captured.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use obc_diag_core::TelemetrySample;

use crate::error::{Result, StreamError};

/// Header spellings accepted besides the canonical column name.
const HEADER_ALIASES: &[(&str, &str)] = &[
    ("RealBatteryVoltage", "Real_Battery_Voltage"),
    ("ExpectedBatteryVoltage", "Expected Battery_Voltage"),
    ("CanMsgReceived", "CanMsg_Received"),
];

pub struct SampleReader<R> {
    reader: csv::Reader<R>,
    headers: StringRecord,
    cycle_column: Option<usize>,
    record: StringRecord,
    line: u64,
}

impl SampleReader<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| StreamError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read> SampleReader<R> {
    pub fn from_reader(input: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(input);
        let headers = reader.headers()?.clone();
        // A zero-byte file carries no header and no rows.
        if !headers.is_empty() {
            check_columns(&headers)?;
        }
        let cycle_column = headers.iter().position(|header| header == "Cycle");
        Ok(Self {
            reader,
            headers,
            cycle_column,
            record: StringRecord::new(),
            line: 1,
        })
    }

    /// Line number of the most recently read record.
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn next_sample(&mut self) -> Option<Result<TelemetrySample>> {
        match self.reader.read_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                self.line = self
                    .record
                    .position()
                    .map_or(self.line + 1, |position| position.line());
                Some(self.decode())
            }
            Err(err) => {
                let line = err
                    .position()
                    .map_or(self.line + 1, |position| position.line());
                self.line = line;
                Some(Err(StreamError::MalformedRecord {
                    line,
                    cycle: self.current_cycle(),
                    reason: err.to_string(),
                }))
            }
        }
    }

    fn decode(&self) -> Result<TelemetrySample> {
        self.record
            .deserialize::<TelemetrySample>(Some(&self.headers))
            .map_err(|err| StreamError::MalformedRecord {
                line: self.line,
                cycle: self.current_cycle(),
                reason: deserialize_reason(&err),
            })
    }

    fn current_cycle(&self) -> Option<u64> {
        self.cycle_column
            .and_then(|column| self.record.get(column))
            .and_then(|value| value.parse().ok())
    }
}

impl<R: Read> Iterator for SampleReader<R> {
    type Item = Result<TelemetrySample>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_sample()
    }
}

fn check_columns(headers: &StringRecord) -> Result<()> {
    for column in TelemetrySample::COLUMNS {
        let alias = HEADER_ALIASES
            .iter()
            .find(|(canonical, _)| *canonical == column)
            .map(|(_, alias)| *alias);
        let present = headers
            .iter()
            .any(|header| header == column || Some(header) == alias);
        if !present {
            return Err(StreamError::MissingColumn(column.to_string()));
        }
    }
    Ok(())
}

fn deserialize_reason(err: &csv::Error) -> String {
    match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => match err.field() {
            Some(field) => format!("field {}: {}", field + 1, err.kind()),
            None => err.kind().to_string(),
        },
        _ => err.to_string(),
    }
}

/// Read every sample of a file, stopping at the first malformed record.
pub fn read_samples(path: &Path) -> Result<Vec<TelemetrySample>> {
    SampleReader::open(path)?.collect()
}
