//! ---
//! obc_section: "02-diagnosis-core"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Telemetry sample and output record data model."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
//! One decoded telemetry row per charger cycle, and the per-cycle output
//! record carrying the twelve fault statuses.
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DiagnosticError;
use crate::fault::{FaultCode, FAULT_COUNT};

/// Charger-reported session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SeqState {
    Init = 0,
    Wait = 1,
    Charging = 2,
    Fault = 3,
    Reset = 4,
}

impl TryFrom<u8> for SeqState {
    type Error = DiagnosticError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SeqState::Init),
            1 => Ok(SeqState::Wait),
            2 => Ok(SeqState::Charging),
            3 => Ok(SeqState::Fault),
            4 => Ok(SeqState::Reset),
            other => Err(DiagnosticError::InvalidSeqState(other)),
        }
    }
}

impl From<SeqState> for u8 {
    fn from(state: SeqState) -> Self {
        state as u8
    }
}

/// Connector and payment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PlugInfo {
    Unplugged = 0,
    PluggedUnpaid = 1,
    PluggedPaid = 2,
}

impl TryFrom<u8> for PlugInfo {
    type Error = DiagnosticError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PlugInfo::Unplugged),
            1 => Ok(PlugInfo::PluggedUnpaid),
            2 => Ok(PlugInfo::PluggedPaid),
            other => Err(DiagnosticError::InvalidPlugInfo(other)),
        }
    }
}

impl From<PlugInfo> for u8 {
    fn from(plug: PlugInfo) -> Self {
        plug as u8
    }
}

/// One input row. Field names follow the telemetry CSV header; the aliases
/// cover the header spelling produced by the raw-data generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    #[serde(rename = "Cycle")]
    pub cycle: u64,
    #[serde(rename = "SeqState")]
    pub seq_state: SeqState,
    #[serde(rename = "PlugInfo")]
    pub plug_info: PlugInfo,
    #[serde(rename = "FLAG_Stop", with = "flag")]
    pub flag_stop: bool,
    #[serde(rename = "FLAG_Relay", with = "flag")]
    pub flag_relay: bool,
    #[serde(rename = "Ia")]
    pub ia: i32,
    #[serde(rename = "Ib")]
    pub ib: i32,
    #[serde(rename = "Ic")]
    pub ic: i32,
    /// Charger-firmware auxiliary status. Advisory only; never read by a detector.
    #[serde(rename = "FaultState")]
    pub fault_state: u8,
    #[serde(rename = "Charg_Cnt")]
    pub charge_count: u32,
    #[serde(rename = "RealBatteryVoltage", alias = "Real_Battery_Voltage")]
    pub real_battery_voltage: u32,
    #[serde(rename = "ExpectedBatteryVoltage", alias = "Expected Battery_Voltage")]
    pub expected_battery_voltage: u32,
    #[serde(rename = "H")]
    pub temperature: i32,
    #[serde(rename = "CanMsgReceived", alias = "CanMsg_Received", with = "flag")]
    pub can_msg_received: bool,
    #[serde(rename = "IsoR")]
    pub iso_resistance: u32,
}

impl TelemetrySample {
    /// Canonical column order of the input file.
    pub const COLUMNS: [&'static str; 15] = [
        "Cycle",
        "SeqState",
        "PlugInfo",
        "FLAG_Stop",
        "FLAG_Relay",
        "Ia",
        "Ib",
        "Ic",
        "FaultState",
        "Charg_Cnt",
        "RealBatteryVoltage",
        "ExpectedBatteryVoltage",
        "H",
        "CanMsgReceived",
        "IsoR",
    ];

    pub fn max_current(&self) -> i32 {
        self.ia.max(self.ib).max(self.ic)
    }

    pub fn voltage_deviation(&self) -> u32 {
        self.real_battery_voltage
            .abs_diff(self.expected_battery_voltage)
    }
}

/// 0/1 encoded boolean columns.
mod flag {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use crate::error::DiagnosticError;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(D::Error::custom(DiagnosticError::InvalidFlag(other))),
        }
    }
}

/// Per-fault diagnostic status as written to the output columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum FaultStatus {
    #[default]
    Clear = 0,
    Diagnosed = 1,
    Confirmed = 2,
}

impl FaultStatus {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_active(self) -> bool {
        !matches!(self, FaultStatus::Clear)
    }
}

impl TryFrom<u8> for FaultStatus {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FaultStatus::Clear),
            1 => Ok(FaultStatus::Diagnosed),
            2 => Ok(FaultStatus::Confirmed),
            other => Err(other),
        }
    }
}

impl fmt::Display for FaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FaultStatus::Clear => "clear",
            FaultStatus::Diagnosed => "diagnosed",
            FaultStatus::Confirmed => "confirmed",
        };
        f.write_str(label)
    }
}

impl Serialize for FaultStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for FaultStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        FaultStatus::try_from(raw).map_err(|value| {
            serde::de::Error::custom(format!("invalid fault status {value} (expected 0..=2)"))
        })
    }
}

/// Output row: the cycle id plus one status per fault code, in code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputRecord {
    pub cycle: u64,
    statuses: [FaultStatus; FAULT_COUNT],
}

impl OutputRecord {
    pub fn new(cycle: u64, statuses: [FaultStatus; FAULT_COUNT]) -> Self {
        Self { cycle, statuses }
    }

    pub fn status(&self, code: FaultCode) -> FaultStatus {
        self.statuses[code.index()]
    }

    pub fn statuses(&self) -> &[FaultStatus; FAULT_COUNT] {
        &self.statuses
    }

    /// Codes whose status is non-clear on this record.
    pub fn active(&self) -> impl Iterator<Item = (FaultCode, FaultStatus)> + '_ {
        FaultCode::all()
            .map(move |code| (code, self.status(code)))
            .filter(|(_, status)| status.is_active())
    }

    /// Header row of the output file.
    pub fn header() -> Vec<&'static str> {
        std::iter::once("Cycle")
            .chain(FaultCode::all().map(FaultCode::column))
            .collect()
    }

    /// Field values in header order.
    pub fn to_fields(&self) -> Vec<String> {
        std::iter::once(self.cycle.to_string())
            .chain(self.statuses.iter().map(|status| status.as_u8().to_string()))
            .collect()
    }
}
