//! ---
//! obc_section: "01-common"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Shared configuration, logging and version metadata."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
//! Shared primitives for the OBC diagnosis workspace: configuration loading,
//! tracing initialisation and build metadata used by the binaries.

pub mod config;
pub mod logging;
pub mod version;

pub use config::{AppConfig, BatchConfig, LoadedAppConfig, LoggingConfig};
pub use logging::{init_tracing, LogFormat};
pub use version::VersionInfo;
