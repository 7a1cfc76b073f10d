//! # Transfer Configuration
//!
//! Serde-backed configuration for the transfer pipeline, the load checker and
//! logging. Every field has a default, so an empty source is a valid
//! configuration.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use metrics_transfer::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // File values are overridden by TRANSFER__SECTION__KEY environment variables
//! let config = ConfigLoader::load(Some("transfer.toml".as_ref()))?;
//!
//! let workers = config.pipeline.effective_workers();
//! let thresholds = config.load_checker.thresholds()?;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::archive::{ArchiveInput, ArchiveOutput};
use crate::constants::{
    DEFAULT_LOAD_REQUEST_TIMEOUT, LOAD_POLL_INTERVAL, MAX_WAIT_STATUS_IN_SEQUENCE,
};
use crate::error::{Result, TransferError};
use crate::load::{parse_threshold_list, LoadCheckerSettings, Threshold};

pub use loader::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Where archives are written to or read from
    pub archive: ArchiveConfig,

    /// Reader worker settings
    pub pipeline: PipelineConfig,

    /// Load check endpoint and thresholds
    pub load_checker: LoadCheckerConfig,

    /// Log level and format
    pub logging: LoggingConfig,
}

/// Archive location configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Archive file, or directory to place an auto-named archive in
    pub path: Option<PathBuf>,
    /// Stream the archive through stdout/stdin instead of a file
    pub piped: bool,
}

impl ArchiveConfig {
    /// Export destination: stdout when piped, otherwise a file at `path`
    /// (auto-named when unset).
    pub fn output(&self) -> ArchiveOutput {
        if self.piped {
            ArchiveOutput::stdout()
        } else {
            ArchiveOutput::File(self.path.clone())
        }
    }

    /// Import origin: stdin when piped, otherwise the file at `path`.
    pub fn input(&self) -> Result<ArchiveInput> {
        if self.piped {
            return Ok(ArchiveInput::stdin());
        }
        self.path
            .clone()
            .map(ArchiveInput::File)
            .ok_or_else(|| {
                invalid("archive.path", "required for import unless archive.piped is set")
            })
    }
}

/// Export pipeline configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of reader workers; 0 uses the host CPU count
    pub workers: usize,
    /// How long a reader sleeps when the load status is WAIT
    pub wait_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            wait_interval_ms: LOAD_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl PipelineConfig {
    /// Reader worker count with `0` resolved to the host CPU count
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms)
    }
}

/// Load checker configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadCheckerConfig {
    /// Base URL of the Prometheus-compatible query endpoint
    pub endpoint: Option<String>,
    /// Comma separated `KEY=VALUE` list of max (WAIT) loads
    pub max_load: String,
    /// Comma separated `KEY=VALUE` list of critical (TERMINATE) loads
    pub critical_load: String,
    pub poll_interval_ms: u64,
    pub max_wait_cycles: u32,
    pub request_timeout_ms: u64,
}

impl Default for LoadCheckerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            max_load: String::new(),
            critical_load: String::new(),
            poll_interval_ms: LOAD_POLL_INTERVAL.as_millis() as u64,
            max_wait_cycles: MAX_WAIT_STATUS_IN_SEQUENCE,
            request_timeout_ms: DEFAULT_LOAD_REQUEST_TIMEOUT.as_millis() as u64,
        }
    }
}

impl LoadCheckerConfig {
    pub fn thresholds(&self) -> Result<Vec<Threshold>> {
        parse_threshold_list(&self.max_load, &self.critical_load)
    }

    pub fn settings(&self) -> LoadCheckerSettings {
        LoadCheckerSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_wait_cycles: self.max_wait_cycles,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; empty picks a level from the environment name
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl TransferConfig {
    /// Validate values that would otherwise only fail once a run has started
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.wait_interval_ms == 0 {
            return Err(invalid("pipeline.wait_interval_ms", "must be greater than 0"));
        }

        if self.load_checker.poll_interval_ms == 0 {
            return Err(invalid("load_checker.poll_interval_ms", "must be greater than 0"));
        }

        if self.load_checker.max_wait_cycles == 0 {
            return Err(invalid("load_checker.max_wait_cycles", "must be greater than 0"));
        }

        if self.load_checker.request_timeout_ms == 0 {
            return Err(invalid("load_checker.request_timeout_ms", "must be greater than 0"));
        }

        let thresholds = self.load_checker.thresholds()?;
        let endpoint_missing = self
            .load_checker
            .endpoint
            .as_deref()
            .map_or(true, |e| e.trim().is_empty());
        if !thresholds.is_empty() && endpoint_missing {
            return Err(invalid(
                "load_checker.endpoint",
                "required when load thresholds are configured",
            ));
        }

        if self.archive.piped && self.archive.path.is_some() {
            return Err(invalid("archive.path", "cannot be combined with archive.piped"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> TransferError {
    TransferError::ConfigurationError(format!("{field}: {reason}"))
}
