//! Configuration Loader
//!
//! Layers an optional configuration file under `TRANSFER__`-prefixed environment
//! variables and validates the result.

use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use super::TransferConfig;
use crate::error::{Result, TransferError};

/// Prefix of environment variables overriding configuration values
pub const ENV_PREFIX: &str = "TRANSFER";

/// Separator between nested keys in environment variable names
pub const ENV_SEPARATOR: &str = "__";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from an optional file and the process environment
    pub fn load(path: Option<&Path>) -> Result<TransferConfig> {
        Self::load_with_env(path, None)
    }

    /// Load configuration with an explicit environment map instead of the process
    /// environment. This is useful for testing without modifying global environment
    /// variables.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<TransferConfig> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env),
        );

        let config: TransferConfig = builder
            .build()
            .and_then(|c| c.try_deserialize::<TransferConfig>())
            .map_err(|e| TransferError::ConfigurationError(e.to_string()))?;

        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string(&config).unwrap_or_else(|_| "[serialization error]".to_string())
        );

        Ok(config)
    }
}
