//! Sequential baseline: every task in plan order on the calling thread.
//! No level grouping and no checkpointing.

use crate::derivation::DerivationCache;
use crate::error::ExecutionError;
use crate::execution::task::{run_task, TaskEnvironment, TaskOutcome};
use crate::executor::ExecutorFactory;
use crate::plan::{ExecutionPlan, TaskResult};
use crate::question::QuestionIndex;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct SequentialExecutor {
    questions: Arc<dyn QuestionIndex>,
    factory: Arc<dyn ExecutorFactory>,
    cache: Arc<DerivationCache>,
}

impl SequentialExecutor {
    pub fn new(questions: Arc<dyn QuestionIndex>, factory: Arc<dyn ExecutorFactory>) -> Self {
        Self {
            questions,
            factory,
            cache: Arc::new(DerivationCache::new()),
        }
    }

    pub fn cache(&self) -> &DerivationCache {
        &self.cache
    }

    pub fn execute(&self, plan: &ExecutionPlan) -> Result<Vec<TaskResult>, ExecutionError> {
        plan.validate()?;
        let env = TaskEnvironment {
            plan_id: plan.plan_id.clone(),
            correlation_id: plan.correlation_id.clone(),
            questions: Arc::clone(&self.questions),
            cache: Arc::clone(&self.cache),
            factory: Arc::clone(&self.factory),
        };

        info!(plan_id = %plan.plan_id, total_tasks = plan.tasks.len(), "Sequential execution started");
        let mut results = Vec::with_capacity(plan.tasks.len());
        for task in &plan.tasks {
            let run = run_task(&env, task);
            match &run.outcome {
                TaskOutcome::Completed(_) => debug!(task_id = %task.task_id, "Task completed"),
                TaskOutcome::Failed(failure) => {
                    warn!(task_id = %task.task_id, error = %failure, "Task failed")
                }
            }
            results.push(run.into_result(task));
        }

        info!(
            plan_id = %plan.plan_id,
            succeeded = results.iter().filter(|r| r.success).count(),
            failed = results.iter().filter(|r| !r.success).count(),
            "Sequential execution completed"
        );
        Ok(results)
    }
}
