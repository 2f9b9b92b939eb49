//! ---
//! obc_section: "04-simulation"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Telemetry scenario generation."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
pub mod scenarios;
pub mod writer;

pub use scenarios::{Scenario, ScenarioBuilder, ScenarioKind};
pub use writer::{write_samples, HeaderStyle};
