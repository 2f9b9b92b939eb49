//! ---
//! obc_section: "03-record-stream"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Record stream: telemetry input, diagnosis output and batch runs."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
pub mod batch;
pub mod error;
pub mod journal;
pub mod pipeline;
pub mod reader;
pub mod writer;

pub use batch::{run_batch, BatchOptions, BatchOutcome};
pub use error::{Result, StreamError};
pub use journal::{JournalEntry, TransitionJournal};
pub use pipeline::{diagnose_stream, run_diagnosis, DiagnosisReport, StreamStats};
pub use reader::{read_samples, SampleReader};
pub use writer::{parse_output, read_output_records, RecordWriter};
