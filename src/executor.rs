//! Pluggable task logic.
//!
//! The execution strategies only ever see these two traits; the analysis a task
//! performs lives behind them.

use crate::plan::{Map, TaskContext};
use std::sync::Arc;

/// Runs the business logic for one task.
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, ctx: &TaskContext<'_>) -> anyhow::Result<Map>;
}

impl<F> TaskExecutor for F
where
    F: Fn(&TaskContext<'_>) -> anyhow::Result<Map> + Send + Sync,
{
    fn execute(&self, ctx: &TaskContext<'_>) -> anyhow::Result<Map> {
        self(ctx)
    }
}

/// Wrap a closure as a shared executor handle.
pub fn executor_fn<F>(f: F) -> Arc<dyn TaskExecutor>
where
    F: Fn(&TaskContext<'_>) -> anyhow::Result<Map> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Builds the executor handle for a question on first reference.
pub trait ExecutorFactory: Send + Sync {
    fn create(&self, question_id: &str, derived_key: &str) -> anyhow::Result<Arc<dyn TaskExecutor>>;
}

/// Factory that hands the same executor to every question.
pub struct SharedExecutor(pub Arc<dyn TaskExecutor>);

impl SharedExecutor {
    pub fn new<E: TaskExecutor + 'static>(executor: E) -> Self {
        Self(Arc::new(executor))
    }
}

impl ExecutorFactory for SharedExecutor {
    fn create(&self, _question_id: &str, _derived_key: &str) -> anyhow::Result<Arc<dyn TaskExecutor>> {
        Ok(Arc::clone(&self.0))
    }
}

/// Factory backed by a closure over `(question_id, derived_key)`.
pub struct FactoryFn<F>(pub F);

impl<F> ExecutorFactory for FactoryFn<F>
where
    F: Fn(&str, &str) -> anyhow::Result<Arc<dyn TaskExecutor>> + Send + Sync,
{
    fn create(&self, question_id: &str, derived_key: &str) -> anyhow::Result<Arc<dyn TaskExecutor>> {
        (self.0)(question_id, derived_key)
    }
}
