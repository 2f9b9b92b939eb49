//! ---
//! obc_section: "02-diagnosis-core"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Fault code catalogue."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::error::DiagnosticError;

/// Diagnostic trouble codes evaluated on every cycle, in evaluation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount, Serialize,
    Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum FaultCode {
    Overcurrent = 0x01,
    Undercurrent = 0x02,
    PlugLoss = 0x03,
    RelayFault = 0x04,
    BmsDeviation = 0x05,
    OverTemperature = 0x06,
    CanLoss = 0x07,
    InsulationFault = 0x08,
    PaymentTimeout = 0x09,
    Watchdog = 0x0A,
    SequenceTimeout = 0x0B,
    TemperatureSensor = 0x0C,
}

pub const FAULT_COUNT: usize = FaultCode::COUNT;

impl FaultCode {
    pub fn all() -> impl Iterator<Item = FaultCode> {
        FaultCode::iter()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Zero-based slot in per-code tables.
    pub fn index(self) -> usize {
        self.code() as usize - 1
    }

    /// Output column name, `F_0x01` .. `F_0x0C`.
    pub fn column(self) -> &'static str {
        match self {
            FaultCode::Overcurrent => "F_0x01",
            FaultCode::Undercurrent => "F_0x02",
            FaultCode::PlugLoss => "F_0x03",
            FaultCode::RelayFault => "F_0x04",
            FaultCode::BmsDeviation => "F_0x05",
            FaultCode::OverTemperature => "F_0x06",
            FaultCode::CanLoss => "F_0x07",
            FaultCode::InsulationFault => "F_0x08",
            FaultCode::PaymentTimeout => "F_0x09",
            FaultCode::Watchdog => "F_0x0A",
            FaultCode::SequenceTimeout => "F_0x0B",
            FaultCode::TemperatureSensor => "F_0x0C",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FaultCode::Overcurrent => "Overcurrent",
            FaultCode::Undercurrent => "Undercurrent",
            FaultCode::PlugLoss => "Plug Loss",
            FaultCode::RelayFault => "Relay Fault",
            FaultCode::BmsDeviation => "BMS Deviation",
            FaultCode::OverTemperature => "Over-Temperature",
            FaultCode::CanLoss => "CAN Loss",
            FaultCode::InsulationFault => "Insulation Fault",
            FaultCode::PaymentTimeout => "Payment Timeout",
            FaultCode::Watchdog => "Watchdog",
            FaultCode::SequenceTimeout => "Sequence Timeout",
            FaultCode::TemperatureSensor => "Temperature Sensor",
        }
    }

    /// Look a code up by its output column name.
    pub fn from_column(column: &str) -> Option<FaultCode> {
        FaultCode::iter().find(|code| code.column() == column.trim())
    }
}

impl TryFrom<u8> for FaultCode {
    type Error = DiagnosticError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        FaultCode::iter()
            .find(|code| code.code() == value)
            .ok_or(DiagnosticError::UnknownFaultCode(value))
    }
}

impl From<FaultCode> for u8 {
    fn from(code: FaultCode) -> Self {
        code.code()
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.code())
    }
}
