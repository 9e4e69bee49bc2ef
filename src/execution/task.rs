//! The task boundary.
//!
//! Everything that can go wrong while running one task (unknown question,
//! malformed question id, executor construction, executor error, panic) is
//! captured here as a `TaskOutcome::Failed`. Nothing raised by task logic gets
//! past this module.

use crate::derivation::DerivationCache;
use crate::error::TaskFailure;
use crate::execution::pool::panic_message;
use crate::executor::ExecutorFactory;
use crate::plan::{ExecutableTask, Map, TaskContext, TaskResult};
use crate::question::QuestionIndex;
use chrono::{DateTime, SecondsFormat, Utc};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tagged outcome of one task attempt.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed(Map),
    Failed(TaskFailure),
}

/// Shared collaborators for every task of a run.
pub(crate) struct TaskEnvironment {
    pub plan_id: String,
    pub correlation_id: String,
    pub questions: Arc<dyn QuestionIndex>,
    pub cache: Arc<DerivationCache>,
    pub factory: Arc<dyn ExecutorFactory>,
}

/// One finished attempt, with timing.
#[derive(Debug)]
pub(crate) struct TaskRun {
    pub outcome: TaskOutcome,
    pub derived_key: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl TaskRun {
    pub fn into_result(self, task: &ExecutableTask) -> TaskResult {
        let result = match self.outcome {
            TaskOutcome::Completed(output) => TaskResult::succeeded(task, output),
            TaskOutcome::Failed(failure) => TaskResult::failed(task, failure.to_string()),
        };
        let mut result = result
            .with_execution_time_ms(self.elapsed.as_secs_f64() * 1000.0)
            .with_metadata("level", task.level())
            .with_metadata("started_at", rfc3339(self.started_at))
            .with_metadata("finished_at", rfc3339(self.finished_at));
        if let Some(key) = self.derived_key {
            result = result.with_metadata("derived_key", key);
        }
        result
    }
}

pub(crate) fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Run `task` to a terminal outcome. Never panics.
pub(crate) fn run_task(env: &TaskEnvironment, task: &ExecutableTask) -> TaskRun {
    let started_at = Utc::now();
    let clock = Instant::now();
    let mut derived_key = None;

    let outcome = match catch_unwind(AssertUnwindSafe(|| attempt(env, task, &mut derived_key))) {
        Ok(Ok(output)) => TaskOutcome::Completed(output),
        Ok(Err(failure)) => TaskOutcome::Failed(failure),
        Err(payload) => TaskOutcome::Failed(TaskFailure::Panicked(panic_message(payload.as_ref()))),
    };

    TaskRun {
        outcome,
        derived_key,
        started_at,
        finished_at: Utc::now(),
        elapsed: clock.elapsed(),
    }
}

fn attempt(
    env: &TaskEnvironment,
    task: &ExecutableTask,
    derived_key: &mut Option<String>,
) -> Result<Map, TaskFailure> {
    let question = env
        .questions
        .lookup(&task.question_id)
        .ok_or_else(|| TaskFailure::QuestionNotFound(task.question_id.clone()))?;
    let key = env.cache.derive_key(&task.question_id)?;
    *derived_key = Some(key.clone());

    let executor = env
        .cache
        .get_or_create_executor(&task.question_id, env.factory.as_ref())
        .map_err(|e| TaskFailure::ExecutorConstruction {
            question_id: task.question_id.clone(),
            message: format!("{:#}", e),
        })?;

    let ctx = TaskContext {
        plan_id: &env.plan_id,
        plan_correlation_id: &env.correlation_id,
        task,
        question: &question,
        derived_key: &key,
    };
    executor
        .execute(&ctx)
        .map_err(|e| TaskFailure::Executor(format!("{:#}", e)))
}
