//! Execution strategies: the level scheduler, the sequential baseline and the
//! dry-run simulator. All three share the task/result contract in `plan`.

pub mod dry_run;
pub mod level;
pub mod options;
mod pool;
pub mod sequential;
pub mod task;

pub use dry_run::{CostModel, DryRunLevel, DryRunSimulator, DryRunSummary};
pub use level::{LevelScheduler, LevelSummary, RunReport};
pub use options::{ExecutorConfig, LevelGate, PoolBackend};
pub use sequential::SequentialExecutor;
pub use task::TaskOutcome;
