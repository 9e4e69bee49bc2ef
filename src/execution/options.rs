//! Executor configuration: pool sizing, checkpoint cadence, backend and level gating.

use crate::execution::dry_run::CostModel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which worker pool runs the tasks of a level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PoolBackend {
    /// Blocking thread pool sized by a semaphore; for I/O- or lock-bound work.
    #[default]
    Threads,
    /// Dedicated compute pool with one thread per worker; for CPU-bound work.
    Compute,
}

/// When the next level may start.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LevelGate {
    /// Next level starts once every task of the current level has finished,
    /// whatever the outcome.
    #[default]
    Completion,
    /// Next level starts only if every task of the current level succeeded.
    /// A failed level halts the run and keeps the checkpoint for a later resume.
    Success,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutorConfig {
    /// Concurrent tasks per level; 0 means one per logical core.
    #[serde(default)]
    pub max_workers: usize,

    /// Results observed between checkpoint writes.
    #[serde(default = "default_checkpoint_batch_size")]
    pub checkpoint_batch_size: usize,

    /// Directory holding `<plan_id>.checkpoint.json` records.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,

    #[serde(default)]
    pub backend: PoolBackend,

    #[serde(default)]
    pub level_gate: LevelGate,

    /// Optional per-task deadline. Unset means tasks run untimed.
    #[serde(default)]
    pub task_timeout_ms: Option<u64>,

    #[serde(default)]
    pub cost_model: CostModel,
}

fn default_checkpoint_batch_size() -> usize {
    10
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from(".strata/checkpoints")
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_workers: 0,
            checkpoint_batch_size: default_checkpoint_batch_size(),
            checkpoint_dir: default_checkpoint_dir(),
            backend: PoolBackend::default(),
            level_gate: LevelGate::default(),
            task_timeout_ms: None,
            cost_model: CostModel::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn resolved_max_workers(&self) -> usize {
        if self.max_workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.max_workers
        }
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.checkpoint_batch_size == 0 {
            return Err("checkpoint_batch_size must be at least 1".to_string());
        }
        if self.checkpoint_dir.as_os_str().is_empty() {
            return Err("checkpoint_dir cannot be empty".to_string());
        }
        if self.task_timeout_ms == Some(0) {
            return Err("task_timeout_ms must be positive when set".to_string());
        }
        self.cost_model.validate()
    }
}
