//! CLI route: single route table and run context.

use crate::checkpoint::CheckpointStore;
use crate::cli::parse::{CheckpointCommands, Commands, ConfigCommands, OutputFormat, PlanCommands};
use crate::cli::presentation::{
    format_checkpoint_list, format_checkpoint_record, format_dry_run_json, format_dry_run_text,
    format_plan_validation,
};
use crate::config::{ConfigLoader, StrataConfig};
use crate::error::ExecutionError;
use crate::execution::DryRunSimulator;
use crate::plan::ExecutionPlan;
use crate::question::InMemoryQuestionIndex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Runtime context for CLI execution: workspace and effective configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: StrataConfig,
}

impl RunContext {
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ExecutionError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::new().load(&workspace_root)?,
        };
        Ok(Self::with_config(workspace_root, config))
    }

    pub fn with_config(workspace_root: PathBuf, config: StrataConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &StrataConfig {
        &self.config
    }

    /// Checkpoint directory, resolved against the workspace when relative.
    pub fn checkpoint_dir(&self) -> PathBuf {
        let dir = &self.config.executor.checkpoint_dir;
        if dir.is_absolute() {
            dir.clone()
        } else {
            self.workspace_root.join(dir)
        }
    }

    pub fn execute(&self, command: &Commands) -> Result<String, ExecutionError> {
        match command {
            Commands::DryRun {
                plan,
                questions,
                format,
            } => self.dry_run(plan, questions, *format),
            Commands::Plan {
                command: PlanCommands::Validate { plan },
            } => {
                let plan = ExecutionPlan::from_json_file(plan)?;
                plan.validate()?;
                Ok(format_plan_validation(&plan))
            }
            Commands::Checkpoint { command } => self.checkpoint(command),
            Commands::Config {
                command: ConfigCommands::Show,
            } => self.config.to_toml_string(),
        }
    }

    fn dry_run(
        &self,
        plan_path: &Path,
        questions_path: &Path,
        format: OutputFormat,
    ) -> Result<String, ExecutionError> {
        let plan = ExecutionPlan::from_json_file(plan_path)?;
        let questions = InMemoryQuestionIndex::from_json_file(questions_path)?;
        debug!(questions = questions.len(), "Question index loaded");

        let simulator =
            DryRunSimulator::with_cost_model(Arc::new(questions), self.config.executor.cost_model.clone());
        let results = simulator.simulate(&plan)?;
        let summary = simulator.summarize(&plan, &results);
        match format {
            OutputFormat::Text => Ok(format_dry_run_text(&summary, &results)),
            OutputFormat::Json => format_dry_run_json(&summary, &results),
        }
    }

    fn checkpoint(&self, command: &CheckpointCommands) -> Result<String, ExecutionError> {
        let store = CheckpointStore::new(self.checkpoint_dir())?;
        match command {
            CheckpointCommands::List { format } => {
                let ids = store.list()?;
                format_checkpoint_list(&ids, *format == OutputFormat::Json)
            }
            CheckpointCommands::Inspect { plan_id } => match store.inspect(plan_id)? {
                Some(record) => format_checkpoint_record(&record),
                None => Ok(format!("No checkpoint for plan {}", plan_id)),
            },
            CheckpointCommands::Verify { plan_id } => match store.resume(plan_id) {
                Ok(Some(completed)) => Ok(format!(
                    "Checkpoint for plan {} is intact ({} completed tasks)",
                    plan_id,
                    completed.len()
                )),
                Ok(None) => Ok(format!("No checkpoint for plan {}", plan_id)),
                Err(e) => Err(e.into()),
            },
            CheckpointCommands::Clear { plan_id } => {
                if store.clear(plan_id)? {
                    info!(plan_id = %plan_id, "Checkpoint cleared");
                    Ok(format!("Cleared checkpoint for plan {}", plan_id))
                } else {
                    Ok(format!("No checkpoint for plan {}", plan_id))
                }
            }
        }
    }
}
