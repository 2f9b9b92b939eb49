//! ---
//! obc_section: "04-simulation"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "CSV serialisation of generated telemetry."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use std::io::Write;

use anyhow::Result;
use csv::WriterBuilder;
use obc_diag_core::TelemetrySample;

/// Header spelling used for generated files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderStyle {
    #[default]
    Canonical,
    /// Spelling found in captured raw-data files.
    Legacy,
}

const LEGACY_HEADER: [&str; 15] = [
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
    "Real_Battery_Voltage",
    "Expected Battery_Voltage",
    "H",
    "CanMsg_Received",
    "IsoR",
];

impl HeaderStyle {
    pub fn columns(self) -> [&'static str; 15] {
        match self {
            HeaderStyle::Canonical => TelemetrySample::COLUMNS,
            HeaderStyle::Legacy => LEGACY_HEADER,
        }
    }
}

pub fn write_samples<W: Write>(
    output: W,
    samples: &[TelemetrySample],
    style: HeaderStyle,
) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(output);
    writer.write_record(style.columns())?;
    for sample in samples {
        writer.serialize(sample)?;
    }
    writer.flush()?;
    Ok(())
}
