//! CLI parse: clap types for strata. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// strata - level-synchronized task execution with checkpoint recovery
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(about = "Inspect execution plans, dry-run them and manage their checkpoints")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a plan and estimate its cost without running any task
    DryRun {
        /// Plan JSON file
        #[arg(long)]
        plan: PathBuf,
        /// Question index JSON file
        #[arg(long)]
        questions: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Plan commands
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Checkpoint commands
    Checkpoint {
        #[command(subcommand)]
        command: CheckpointCommands,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Check plan structure: ids, duplicates and levels
    Validate {
        #[arg(long)]
        plan: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum CheckpointCommands {
    /// List plans with a stored checkpoint
    List {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the stored checkpoint record
    Inspect { plan_id: String },
    /// Recompute and compare the integrity hash
    Verify { plan_id: String },
    /// Delete the checkpoint
    Clear { plan_id: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}
