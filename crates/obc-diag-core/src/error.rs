//! ---
//! obc_section: "02-diagnosis-core"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Error types raised by the diagnosis engine."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiagnosticError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiagnosticError {
    #[error("invalid SeqState value {0} (expected 0..=4)")]
    InvalidSeqState(u8),
    #[error("invalid PlugInfo value {0} (expected 0..=2)")]
    InvalidPlugInfo(u8),
    #[error("invalid boolean flag value {0} (expected 0 or 1)")]
    InvalidFlag(u8),
    #[error("unknown fault code 0x{0:02X}")]
    UnknownFaultCode(u8),
    #[error("invalid calibration: {0}")]
    InvalidThresholds(String),
}
