//! ---
//! obc_section: "02-diagnosis-core"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Per-run fault tallies."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use serde::Serialize;

use crate::fault::FaultCode;
use crate::model::{FaultStatus, OutputRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaultTally {
    pub code: FaultCode,
    pub name: &'static str,
    pub column: &'static str,
    pub diagnosed_cycles: u64,
    pub confirmed_cycles: u64,
    pub first_confirmed_cycle: Option<u64>,
}

impl FaultTally {
    fn new(code: FaultCode) -> Self {
        Self {
            code,
            name: code.name(),
            column: code.column(),
            diagnosed_cycles: 0,
            confirmed_cycles: 0,
            first_confirmed_cycle: None,
        }
    }

    pub fn ever_confirmed(&self) -> bool {
        self.first_confirmed_cycle.is_some()
    }
}

/// Aggregate of output records, one tally per fault code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaultSummary {
    pub cycles: u64,
    pub faults: Vec<FaultTally>,
}

impl Default for FaultSummary {
    fn default() -> Self {
        Self {
            cycles: 0,
            faults: FaultCode::all().map(FaultTally::new).collect(),
        }
    }
}

impl FaultSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: &OutputRecord) {
        self.cycles += 1;
        for tally in self.faults.iter_mut() {
            match record.status(tally.code) {
                FaultStatus::Clear => {}
                FaultStatus::Diagnosed => tally.diagnosed_cycles += 1,
                FaultStatus::Confirmed => {
                    tally.confirmed_cycles += 1;
                    tally.first_confirmed_cycle.get_or_insert(record.cycle);
                }
            }
        }
    }

    pub fn tally(&self, code: FaultCode) -> &FaultTally {
        &self.faults[code.index()]
    }

    /// Codes confirmed at least once, in code order.
    pub fn confirmed_codes(&self) -> impl Iterator<Item = FaultCode> + '_ {
        self.faults
            .iter()
            .filter(|tally| tally.ever_confirmed())
            .map(|tally| tally.code)
    }
}

impl<'a> FromIterator<&'a OutputRecord> for FaultSummary {
    fn from_iter<I: IntoIterator<Item = &'a OutputRecord>>(iter: I) -> Self {
        let mut summary = FaultSummary::new();
        for record in iter {
            summary.record(record);
        }
        summary
    }
}
