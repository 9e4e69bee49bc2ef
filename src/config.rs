//! Configuration
//!
//! `StrataConfig` is layered from built-in defaults, the user's global config
//! file, the workspace's `config/` directory and `STRATA__*` environment
//! variables, later layers overriding earlier ones.

use crate::error::ExecutionError;
use crate::execution::ExecutorConfig;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StrataConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StrataConfig {
    pub fn validate(&self) -> Result<(), ExecutionError> {
        self.executor
            .validate()
            .map_err(|e| ExecutionError::Config(format!("executor: {}", e)))?;
        self.logging
            .validate()
            .map_err(|e| ExecutionError::Config(format!("logging: {}", e)))?;
        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ExecutionError> {
        toml::to_string_pretty(self)
            .map_err(|e| ExecutionError::Config(format!("Failed to render config: {}", e)))
    }
}
