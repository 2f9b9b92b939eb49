//! ---
//! obc_section: "02-diagnosis-core"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Fault diagnosis engine for on-board charger telemetry."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
pub mod detector;
pub mod engine;
pub mod error;
pub mod fault;
pub mod model;
pub mod rules;
pub mod session;
pub mod summary;
pub mod thresholds;
pub mod watchdog;

pub use detector::Detector;
pub use engine::{CycleOutcome, DiagnosticEngine, FaultTransition, TransitionKind};
pub use error::{DiagnosticError, Result};
pub use fault::{FaultCode, FAULT_COUNT};
pub use model::{FaultStatus, OutputRecord, PlugInfo, SeqState, TelemetrySample};
pub use session::SessionState;
pub use summary::{FaultSummary, FaultTally};
pub use thresholds::{DebounceCounts, FaultThresholds, RestartInhibit, WatchdogLatch};

/// Diagnose a complete in-memory sample sequence with a fresh engine.
pub fn diagnose_all<'a, I>(thresholds: FaultThresholds, samples: I) -> Result<Vec<OutputRecord>>
where
    I: IntoIterator<Item = &'a TelemetrySample>,
{
    let mut engine = DiagnosticEngine::new(thresholds)?;
    Ok(samples
        .into_iter()
        .map(|sample| engine.process(sample))
        .collect())
}
