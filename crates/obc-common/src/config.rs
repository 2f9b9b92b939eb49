//! ---
//! obc_section: "01-common"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "TOML configuration for the diagnosis tools."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use obc_diag_core::FaultThresholds;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_max_parallel() -> usize {
    4
}

fn default_output_suffix() -> String {
    "_result".to_owned()
}

/// Candidate files inspected when no explicit path or environment override is given.
pub const DEFAULT_CANDIDATES: [&str; 2] = ["obc-diag.toml", "config/obc-diag.toml"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub thresholds: FaultThresholds,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when built-in defaults were used.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "OBC_DIAG_CONFIG";

    /// Resolve the configuration: `explicit`, then `OBC_DIAG_CONFIG`, then the
    /// first existing candidate, otherwise defaults.
    pub fn load_with_source<P: AsRef<Path>>(
        explicit: Option<&Path>,
        candidates: &[P],
    ) -> Result<LoadedAppConfig> {
        if let Some(path) = explicit {
            return Self::loaded_from(path.to_path_buf());
        }

        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                return Self::loaded_from(PathBuf::from(env_path.trim()));
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                return Self::loaded_from(candidate.as_ref().to_path_buf());
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using built-in calibration"
        );
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    fn loaded_from(path: PathBuf) -> Result<LoadedAppConfig> {
        let config = Self::from_path(&path)?;
        Ok(LoadedAppConfig {
            config,
            source: Some(path),
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.batch.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Attach the daily rolling JSON file layer.
    #[serde(default)]
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            file_output: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            output_suffix: default_output_suffix(),
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel == 0 {
            return Err(anyhow!("batch.max_parallel must be at least 1"));
        }
        if self.output_suffix.trim().is_empty() {
            return Err(anyhow!(
                "batch.output_suffix must not be empty; outputs would overwrite inputs"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obc_diag_core::WatchdogLatch;

    #[test]
    fn empty_document_yields_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.thresholds, FaultThresholds::default());
        assert_eq!(config.batch.max_parallel, 4);
        assert_eq!(config.batch.output_suffix, "_result");
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
        assert!(!config.logging.file_output);
    }

    #[test]
    fn sections_override_defaults() {
        let config: AppConfig = r#"
            [thresholds]
            rated_current_limit = 40
            watchdog_latch = "self-clearing"

            [thresholds.debounce]
            can_loss = 3

            [logging]
            format = "pretty"
            file_output = true

            [batch]
            max_parallel = 2
            output_suffix = "_diag"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.thresholds.rated_current_limit, 40);
        assert_eq!(config.thresholds.debounce.can_loss, 3);
        assert_eq!(config.thresholds.watchdog_latch, WatchdogLatch::SelfClearing);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.batch.output_suffix, "_diag");
    }

    #[test]
    fn invalid_sections_are_rejected() {
        assert!("[batch]\nmax_parallel = 0".parse::<AppConfig>().is_err());
        assert!("[batch]\noutput_suffix = \"\"".parse::<AppConfig>().is_err());
        assert!("[thresholds]\nwatchdog_max_gap = 0".parse::<AppConfig>().is_err());
        assert!("[thresholds]\nrated_curent_limit = 3".parse::<AppConfig>().is_err());
    }
}
