//! Error types for the strata task executor.

use std::path::PathBuf;
use thiserror::Error;

/// Checkpoint persistence errors
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The stored record exists but cannot be trusted: unreadable, unparseable,
    /// or its integrity hash does not match its contents.
    #[error("Checkpoint for plan {plan_id} is corrupt: {reason}")]
    Corruption { plan_id: String, reason: String },

    #[error("Invalid plan id for checkpoint storage: {0:?}")]
    InvalidPlanId(String),

    #[error("Checkpoint serialization failed: {0}")]
    Serialization(String),

    #[error("Checkpoint I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckpointError {
    pub fn is_corruption(&self) -> bool {
        matches!(self, CheckpointError::Corruption { .. })
    }
}

/// Question id parsing errors raised by key derivation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DerivationError {
    #[error("Malformed question id {0:?}: expected a letter prefix followed by digits (e.g. Q001)")]
    MalformedQuestionId(String),

    #[error("Question number out of range in {0:?}: must be at least 1")]
    QuestionNumberOutOfRange(String),
}

/// Failures captured at the task boundary.
///
/// These never cross the scheduler: each one is rendered into the `error`
/// field of a failed `TaskResult`.
#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error("question {0} not found in question index")]
    QuestionNotFound(String),

    #[error(transparent)]
    Derivation(#[from] DerivationError),

    #[error("failed to construct executor for question {question_id}: {message}")]
    ExecutorConstruction { question_id: String, message: String },

    #[error("{0}")]
    Executor(String),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task timed out after {0} ms")]
    TimedOut(u64),

    #[error("worker pool closed before task completed")]
    PoolClosed,
}

/// Errors returned by the execution strategies themselves
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Worker pool error: {0}")]
    Pool(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Plan I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ExecutionError {
    fn from(err: config::ConfigError) -> Self {
        ExecutionError::Config(err.to_string())
    }
}
