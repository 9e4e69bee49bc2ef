//! Strata: level-synchronized parallel task execution with checkpoint recovery.
//!
//! Tasks of an execution plan are grouped by epistemic level and run level by
//! level on a bounded worker pool. Progress is checkpointed to disk with an
//! integrity hash so an interrupted plan resumes without repeating work.

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod derivation;
pub mod error;
pub mod execution;
pub mod executor;
pub mod logging;
pub mod plan;
pub mod question;

pub use checkpoint::{CheckpointRecord, CheckpointStore};
pub use derivation::{derive_key, DerivationCache};
pub use error::{CheckpointError, DerivationError, ExecutionError, TaskFailure};
pub use execution::{
    CostModel, DryRunSimulator, ExecutorConfig, LevelGate, LevelScheduler, PoolBackend,
    RunReport, SequentialExecutor,
};
pub use executor::{executor_fn, ExecutorFactory, FactoryFn, SharedExecutor, TaskExecutor};
pub use plan::{ExecutableTask, ExecutionPlan, Map, TaskContext, TaskResult};
pub use question::{InMemoryQuestionIndex, QuestionIndex, QuestionRecord};
