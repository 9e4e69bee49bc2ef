//! Loader that stacks the configuration sources in precedence order.

use super::merge::merge_policy::builder_with_defaults;
use super::sources::{environment, global_file, workspace_file};
use super::StrataConfig;
use crate::error::ExecutionError;
use config::File;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    include_global: bool,
    include_environment: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            include_global: true,
            include_environment: true,
        }
    }

    /// Skip the user-level config file.
    pub fn with_global(mut self, include: bool) -> Self {
        self.include_global = include;
        self
    }

    /// Skip `STRATA__*` environment overrides.
    pub fn with_environment(mut self, include: bool) -> Self {
        self.include_environment = include;
        self
    }

    /// Defaults, then global file, then workspace files, then environment.
    pub fn load(&self, workspace_root: &Path) -> Result<StrataConfig, ExecutionError> {
        let mut builder = builder_with_defaults()?;
        if self.include_global {
            builder = global_file::add_to_builder(builder)?;
        }
        builder = workspace_file::add_to_builder(builder, workspace_root)?;
        if self.include_environment {
            builder = environment::add_to_builder(builder);
        }

        let config: StrataConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(workspace_root = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load a single explicit file on top of the defaults.
    pub fn load_from_file(path: &Path) -> Result<StrataConfig, ExecutionError> {
        let config: StrataConfig = builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
