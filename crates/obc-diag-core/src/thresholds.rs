//! ---
//! obc_section: "02-diagnosis-core"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Tunable fault calibration table."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
//! Every limit and debounce count used by the detectors lives here so the
//! engine can be recalibrated from configuration. Defaults match the
//! production calibration of the charger.
use serde::{Deserialize, Serialize};

use crate::error::{DiagnosticError, Result};
use crate::fault::FaultCode;

fn default_rated_current_limit() -> i32 {
    32
}

fn default_min_current_floor() -> i32 {
    6
}

fn default_undercurrent_min_charge_count() -> u32 {
    20
}

fn default_bms_min_charge_count() -> u32 {
    10
}

fn default_bms_max_deviation() -> u32 {
    10
}

fn default_overheat_limit() -> i32 {
    60
}

fn default_temp_spike_limit() -> i32 {
    120
}

fn default_temp_low_limit() -> i32 {
    -20
}

fn default_min_insulation_ohms() -> u32 {
    500
}

fn default_watchdog_max_gap() -> u64 {
    10
}

/// Current, voltage, temperature and insulation limits plus debounce counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FaultThresholds {
    /// Amps; overcurrent when the highest phase exceeds it.
    #[serde(default = "default_rated_current_limit")]
    pub rated_current_limit: i32,
    /// Amps; undercurrent when every phase is below it.
    #[serde(default = "default_min_current_floor")]
    pub min_current_floor: i32,
    #[serde(default = "default_undercurrent_min_charge_count")]
    pub undercurrent_min_charge_count: u32,
    #[serde(default = "default_bms_min_charge_count")]
    pub bms_min_charge_count: u32,
    /// Tenths of a volt.
    #[serde(default = "default_bms_max_deviation")]
    pub bms_max_deviation: u32,
    /// Degrees Celsius, sustained overheat.
    #[serde(default = "default_overheat_limit")]
    pub overheat_limit: i32,
    /// Degrees Celsius, implausible sensor spike.
    #[serde(default = "default_temp_spike_limit")]
    pub temp_spike_limit: i32,
    /// Degrees Celsius, implausibly cold sensor reading.
    #[serde(default = "default_temp_low_limit")]
    pub temp_low_limit: i32,
    /// Ohms.
    #[serde(default = "default_min_insulation_ohms")]
    pub min_insulation_ohms: u32,
    /// Largest tolerated jump between consecutive cycle ids.
    #[serde(default = "default_watchdog_max_gap")]
    pub watchdog_max_gap: u64,
    #[serde(default)]
    pub debounce: DebounceCounts,
    #[serde(default)]
    pub watchdog_latch: WatchdogLatch,
    #[serde(default)]
    pub restart_inhibit: Option<RestartInhibit>,
}

impl Default for FaultThresholds {
    fn default() -> Self {
        Self {
            rated_current_limit: default_rated_current_limit(),
            min_current_floor: default_min_current_floor(),
            undercurrent_min_charge_count: default_undercurrent_min_charge_count(),
            bms_min_charge_count: default_bms_min_charge_count(),
            bms_max_deviation: default_bms_max_deviation(),
            overheat_limit: default_overheat_limit(),
            temp_spike_limit: default_temp_spike_limit(),
            temp_low_limit: default_temp_low_limit(),
            min_insulation_ohms: default_min_insulation_ohms(),
            watchdog_max_gap: default_watchdog_max_gap(),
            debounce: DebounceCounts::default(),
            watchdog_latch: WatchdogLatch::default(),
            restart_inhibit: None,
        }
    }
}

impl FaultThresholds {
    pub fn validate(&self) -> Result<()> {
        if self.watchdog_max_gap == 0 {
            return Err(DiagnosticError::InvalidThresholds(
                "watchdog_max_gap must be greater than zero".to_owned(),
            ));
        }
        if self.temp_spike_limit <= self.overheat_limit {
            return Err(DiagnosticError::InvalidThresholds(format!(
                "temp_spike_limit ({}) must exceed overheat_limit ({})",
                self.temp_spike_limit, self.overheat_limit
            )));
        }
        if self.temp_low_limit >= self.overheat_limit {
            return Err(DiagnosticError::InvalidThresholds(format!(
                "temp_low_limit ({}) must be below overheat_limit ({})",
                self.temp_low_limit, self.overheat_limit
            )));
        }
        if self.min_current_floor >= self.rated_current_limit {
            return Err(DiagnosticError::InvalidThresholds(format!(
                "min_current_floor ({}) must be below rated_current_limit ({})",
                self.min_current_floor, self.rated_current_limit
            )));
        }
        self.debounce.validate()?;
        if let Some(inhibit) = &self.restart_inhibit {
            if inhibit.after == 0 {
                return Err(DiagnosticError::InvalidThresholds(
                    "restart_inhibit.after must be greater than zero".to_owned(),
                ));
            }
        }
        Ok(())
    }

    /// Confirmation count after which `code` stays latched across RESET.
    pub fn restart_inhibit_after(&self, code: FaultCode) -> Option<u32> {
        self.restart_inhibit
            .as_ref()
            .filter(|inhibit| inhibit.codes.contains(&code))
            .map(|inhibit| inhibit.after)
    }
}

/// Consecutive qualifying cycles required to confirm each debounced fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebounceCounts {
    pub overcurrent: u32,
    pub undercurrent: u32,
    pub bms_deviation: u32,
    pub over_temperature: u32,
    pub can_loss: u32,
    pub insulation: u32,
    pub payment_timeout: u32,
    pub sequence_timeout: u32,
    pub temperature_sensor: u32,
}

impl Default for DebounceCounts {
    fn default() -> Self {
        Self {
            overcurrent: 10,
            undercurrent: 10,
            bms_deviation: 10,
            over_temperature: 10,
            can_loss: 5,
            insulation: 10,
            payment_timeout: 5,
            sequence_timeout: 10,
            temperature_sensor: 3,
        }
    }
}

impl DebounceCounts {
    /// Debounce count for `code`; `None` for the immediate detectors.
    pub fn for_code(&self, code: FaultCode) -> Option<u32> {
        match code {
            FaultCode::Overcurrent => Some(self.overcurrent),
            FaultCode::Undercurrent => Some(self.undercurrent),
            FaultCode::BmsDeviation => Some(self.bms_deviation),
            FaultCode::OverTemperature => Some(self.over_temperature),
            FaultCode::CanLoss => Some(self.can_loss),
            FaultCode::InsulationFault => Some(self.insulation),
            FaultCode::PaymentTimeout => Some(self.payment_timeout),
            FaultCode::SequenceTimeout => Some(self.sequence_timeout),
            FaultCode::TemperatureSensor => Some(self.temperature_sensor),
            FaultCode::PlugLoss | FaultCode::RelayFault | FaultCode::Watchdog => None,
        }
    }

    fn validate(&self) -> Result<()> {
        for code in FaultCode::all() {
            if self.for_code(code) == Some(0) {
                return Err(DiagnosticError::InvalidThresholds(format!(
                    "debounce count for {} ({}) must be greater than zero",
                    code,
                    code.name()
                )));
            }
        }
        Ok(())
    }
}

/// How a confirmed watchdog fault is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchdogLatch {
    /// Held until the session passes RESET -> INIT, like the other immediate faults.
    #[default]
    UntilReset,
    /// Reported only on the violating cycle.
    SelfClearing,
}

/// Keeps selected faults latched across RESET once they recur often enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestartInhibit {
    pub after: u32,
    pub codes: Vec<FaultCode>,
}
