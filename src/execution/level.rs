//! Level scheduler: runs a plan one epistemic level at a time.
//!
//! Tasks of a level run concurrently on a bounded worker pool; the next level is
//! only dispatched once every task of the current one has produced a result.
//! Progress is checkpointed every `checkpoint_batch_size` results so an
//! interrupted run can resume without re-executing completed tasks.

use crate::checkpoint::CheckpointStore;
use crate::derivation::DerivationCache;
use crate::error::{CheckpointError, ExecutionError};
use crate::execution::options::{ExecutorConfig, LevelGate};
use crate::execution::pool::WorkerPool;
use crate::execution::task::{rfc3339, run_task, TaskEnvironment, TaskOutcome};
use crate::executor::ExecutorFactory;
use crate::plan::{ExecutableTask, ExecutionPlan, TaskResult};
use crate::question::QuestionIndex;
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelSummary {
    pub level: u32,
    pub total_count: usize,
    /// Tasks already completed by an earlier run.
    pub skipped_count: usize,
    pub succeeded_count: usize,
    pub failed_count: usize,
}

/// Results of one `execute_with_summary` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub plan_id: String,
    /// Results of tasks attempted in this run, in plan order.
    pub results: Vec<TaskResult>,
    pub level_summaries: Vec<LevelSummary>,
    /// Tasks skipped because a checkpoint marked them completed.
    pub resumed_count: usize,
    /// Set when `LevelGate::Success` stopped the run after a failed level.
    pub halted_at_level: Option<u32>,
}

impl RunReport {
    pub fn total_failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

/// Wall-clock window of a submission, for results the pool itself produced
/// (timeouts, closed pool) where the task never reported its own timing.
struct Span {
    submitted_at: DateTime<Utc>,
    resolved_at: DateTime<Utc>,
    elapsed: Duration,
}

pub struct LevelScheduler {
    config: ExecutorConfig,
    checkpoints: Arc<CheckpointStore>,
    questions: Arc<dyn QuestionIndex>,
    factory: Arc<dyn ExecutorFactory>,
    cache: Arc<DerivationCache>,
}

impl LevelScheduler {
    pub fn new(
        config: ExecutorConfig,
        checkpoints: Arc<CheckpointStore>,
        questions: Arc<dyn QuestionIndex>,
        factory: Arc<dyn ExecutorFactory>,
    ) -> Self {
        Self {
            config,
            checkpoints,
            questions,
            factory,
            cache: Arc::new(DerivationCache::new()),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn cache(&self) -> &DerivationCache {
        &self.cache
    }

    /// Execute the plan and return the results of the tasks attempted in this
    /// run, in plan order.
    pub async fn execute(&self, plan: &ExecutionPlan) -> Result<Vec<TaskResult>, ExecutionError> {
        Ok(self.execute_with_summary(plan).await?.results)
    }

    pub async fn execute_with_summary(
        &self,
        plan: &ExecutionPlan,
    ) -> Result<RunReport, ExecutionError> {
        plan.validate()?;
        self.config.validate().map_err(ExecutionError::Config)?;

        let plan_id = plan.plan_id.as_str();
        let mut completed_ids = self.resume_completed(plan_id);
        let resumed_count = plan
            .tasks
            .iter()
            .filter(|t| completed_ids.contains(&t.task_id))
            .count();

        let mut levels: BTreeMap<u32, Vec<&ExecutableTask>> = BTreeMap::new();
        for task in &plan.tasks {
            levels.entry(task.level()).or_default().push(task);
        }

        info!(
            plan_id,
            total_tasks = plan.tasks.len(),
            total_levels = levels.len(),
            resumed = resumed_count,
            backend = ?self.config.backend,
            "Plan execution started"
        );

        let env = Arc::new(TaskEnvironment {
            plan_id: plan.plan_id.clone(),
            correlation_id: plan.correlation_id.clone(),
            questions: Arc::clone(&self.questions),
            cache: Arc::clone(&self.cache),
            factory: Arc::clone(&self.factory),
        });

        let mut results: HashMap<String, TaskResult> = HashMap::new();
        let mut level_summaries = Vec::with_capacity(levels.len());
        let mut since_checkpoint = 0usize;
        let mut halted_at_level = None;

        for (&level, level_tasks) in &levels {
            let pending: Vec<&ExecutableTask> = level_tasks
                .iter()
                .copied()
                .filter(|t| !completed_ids.contains(&t.task_id))
                .collect();
            let mut summary = LevelSummary {
                level,
                total_count: level_tasks.len(),
                skipped_count: level_tasks.len() - pending.len(),
                succeeded_count: 0,
                failed_count: 0,
            };

            if pending.is_empty() {
                debug!(plan_id, level, "Level already completed; skipping");
                level_summaries.push(summary);
                continue;
            }

            info!(plan_id, level, pending = pending.len(), "Level started");
            let pool = WorkerPool::new(self.config.backend, self.config.resolved_max_workers())?;
            let timeout = self.config.task_timeout();

            let mut in_flight = FuturesUnordered::new();
            for task in pending {
                let job_env = Arc::clone(&env);
                let job_task = task.clone();
                let submitted_at = Utc::now();
                let clock = Instant::now();
                let submission = pool.submit(move || run_task(&job_env, &job_task), timeout);
                in_flight.push(async move {
                    let outcome = submission.await;
                    let span = Span {
                        submitted_at,
                        resolved_at: Utc::now(),
                        elapsed: clock.elapsed(),
                    };
                    (task, outcome, span)
                });
            }

            // Barrier: drain every submission of this level before moving on.
            while let Some((task, outcome, span)) = in_flight.next().await {
                let result = match outcome {
                    Ok(run) => {
                        match &run.outcome {
                            TaskOutcome::Completed(_) => {
                                debug!(plan_id, level, task_id = %task.task_id, "Task completed")
                            }
                            TaskOutcome::Failed(failure) => {
                                warn!(plan_id, level, task_id = %task.task_id, error = %failure, "Task failed")
                            }
                        }
                        run.into_result(task)
                    }
                    Err(failure) => {
                        warn!(plan_id, level, task_id = %task.task_id, error = %failure, "Task failed in worker pool");
                        TaskResult::failed(task, failure.to_string())
                            .with_execution_time_ms(span.elapsed.as_secs_f64() * 1000.0)
                            .with_metadata("level", level)
                            .with_metadata("started_at", rfc3339(span.submitted_at))
                            .with_metadata("finished_at", rfc3339(span.resolved_at))
                    }
                };

                if result.success {
                    summary.succeeded_count += 1;
                    completed_ids.insert(task.task_id.clone());
                } else {
                    summary.failed_count += 1;
                }
                results.insert(task.task_id.clone(), result);

                since_checkpoint += 1;
                if since_checkpoint >= self.config.checkpoint_batch_size {
                    self.flush_checkpoint(plan_id, &completed_ids);
                    since_checkpoint = 0;
                }
            }

            info!(
                plan_id,
                level,
                succeeded = summary.succeeded_count,
                failed = summary.failed_count,
                "Level completed"
            );
            let level_failed = summary.failed_count > 0;
            level_summaries.push(summary);

            if level_failed && self.config.level_gate == LevelGate::Success {
                warn!(plan_id, level, "Level had failures; halting before next level");
                halted_at_level = Some(level);
                break;
            }
        }

        self.flush_checkpoint(plan_id, &completed_ids);
        if halted_at_level.is_none() {
            if let Err(e) = self.checkpoints.clear(plan_id) {
                error!(plan_id, error = %e, "Failed to clear checkpoint");
            }
        }

        let ordered: Vec<TaskResult> = plan
            .tasks
            .iter()
            .filter_map(|t| results.remove(&t.task_id))
            .collect();

        let report = RunReport {
            plan_id: plan.plan_id.clone(),
            results: ordered,
            level_summaries,
            resumed_count,
            halted_at_level,
        };
        info!(
            plan_id,
            attempted = report.results.len(),
            failed = report.total_failed(),
            halted = halted_at_level.is_some(),
            "Plan execution finished"
        );
        Ok(report)
    }

    /// Completed ids from a previous run, or an empty set when there is none or
    /// it cannot be trusted.
    fn resume_completed(&self, plan_id: &str) -> HashSet<String> {
        match self.checkpoints.resume(plan_id) {
            Ok(Some(completed)) => {
                info!(plan_id, completed = completed.len(), "Resuming from checkpoint");
                completed
            }
            Ok(None) => HashSet::new(),
            Err(e @ CheckpointError::Corruption { .. }) => {
                warn!(plan_id, error = %e, "Ignoring corrupt checkpoint; starting from scratch");
                HashSet::new()
            }
            Err(e) => {
                warn!(plan_id, error = %e, "Checkpoint unavailable; starting from scratch");
                HashSet::new()
            }
        }
    }

    fn flush_checkpoint(&self, plan_id: &str, completed_ids: &HashSet<String>) {
        if let Err(e) = self.checkpoints.save(plan_id, completed_ids, BTreeMap::new()) {
            error!(plan_id, error = %e, "Failed to save checkpoint");
        }
    }
}
