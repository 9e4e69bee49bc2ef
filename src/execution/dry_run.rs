//! Dry-run simulation: validates every task against the question index and
//! estimates its cost without running any task logic.

use crate::derivation::derive_key;
use crate::error::ExecutionError;
use crate::plan::{ExecutableTask, ExecutionPlan, Map, TaskResult};
use crate::question::{QuestionIndex, QuestionRecord};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Linear cost model for `estimated_time_ms`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostModel {
    #[serde(default = "default_base_ms")]
    pub base_ms: f64,
    #[serde(default = "default_per_pattern_ms")]
    pub per_pattern_ms: f64,
    #[serde(default = "default_per_signal_ms")]
    pub per_signal_ms: f64,
    #[serde(default = "default_per_expected_element_ms")]
    pub per_expected_element_ms: f64,
    #[serde(default = "default_per_chunk_char_ms")]
    pub per_chunk_char_ms: f64,
    #[serde(default = "default_per_method_set_ms")]
    pub per_method_set_ms: f64,
}

fn default_base_ms() -> f64 {
    50.0
}

fn default_per_pattern_ms() -> f64 {
    10.0
}

fn default_per_signal_ms() -> f64 {
    5.0
}

fn default_per_expected_element_ms() -> f64 {
    8.0
}

fn default_per_chunk_char_ms() -> f64 {
    0.01
}

fn default_per_method_set_ms() -> f64 {
    25.0
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            base_ms: default_base_ms(),
            per_pattern_ms: default_per_pattern_ms(),
            per_signal_ms: default_per_signal_ms(),
            per_expected_element_ms: default_per_expected_element_ms(),
            per_chunk_char_ms: default_per_chunk_char_ms(),
            per_method_set_ms: default_per_method_set_ms(),
        }
    }
}

impl CostModel {
    pub fn validate(&self) -> Result<(), String> {
        let weights = [
            ("base_ms", self.base_ms),
            ("per_pattern_ms", self.per_pattern_ms),
            ("per_signal_ms", self.per_signal_ms),
            ("per_expected_element_ms", self.per_expected_element_ms),
            ("per_chunk_char_ms", self.per_chunk_char_ms),
            ("per_method_set_ms", self.per_method_set_ms),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!("cost_model.{} must be a non-negative number", name));
            }
        }
        Ok(())
    }

    pub fn estimate_ms(&self, task: &ExecutableTask, question: &QuestionRecord) -> f64 {
        self.base_ms
            + self.per_pattern_ms * task.patterns.len() as f64
            + self.per_signal_ms * task.signals.len() as f64
            + self.per_expected_element_ms * task.expected_elements.len() as f64
            + self.per_chunk_char_ms * task.chunk_text.chars().count() as f64
            + self.per_method_set_ms * question.method_sets.len() as f64
    }
}

/// Per-level totals for capacity planning.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DryRunLevel {
    pub level: u32,
    pub task_count: usize,
    pub invalid_count: usize,
    pub estimated_time_ms: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DryRunSummary {
    pub plan_id: String,
    pub task_count: usize,
    pub invalid_count: usize,
    pub estimated_time_ms: f64,
    pub levels: Vec<DryRunLevel>,
}

pub struct DryRunSimulator {
    questions: Arc<dyn QuestionIndex>,
    cost_model: CostModel,
}

impl DryRunSimulator {
    pub fn new(questions: Arc<dyn QuestionIndex>) -> Self {
        Self::with_cost_model(questions, CostModel::default())
    }

    pub fn with_cost_model(questions: Arc<dyn QuestionIndex>, cost_model: CostModel) -> Self {
        Self {
            questions,
            cost_model,
        }
    }

    /// One synthesized result per task, in plan order.
    pub fn simulate(&self, plan: &ExecutionPlan) -> Result<Vec<TaskResult>, ExecutionError> {
        plan.validate()?;
        info!(plan_id = %plan.plan_id, total_tasks = plan.tasks.len(), "Dry run started");
        let results: Vec<TaskResult> = plan.tasks.iter().map(|task| self.simulate_task(task)).collect();
        info!(
            plan_id = %plan.plan_id,
            invalid = results.iter().filter(|r| !r.success).count(),
            "Dry run completed"
        );
        Ok(results)
    }

    pub fn simulate_task(&self, task: &ExecutableTask) -> TaskResult {
        let Some(question) = self.questions.lookup(&task.question_id) else {
            debug!(task_id = %task.task_id, question_id = %task.question_id, "Unknown question");
            return TaskResult::failed(
                task,
                format!("question {} not found in question index", task.question_id),
            )
            .with_metadata("dry_run", true);
        };

        let estimate = self.cost_model.estimate_ms(task, &question);
        let mut output = Map::new();
        output.insert("dry_run".to_string(), json!(true));
        output.insert("estimated_time_ms".to_string(), json!(estimate));
        output.insert("pattern_count".to_string(), json!(task.patterns.len()));
        output.insert("signal_count".to_string(), json!(task.signals.len()));
        output.insert(
            "expected_element_count".to_string(),
            json!(task.expected_elements.len()),
        );
        output.insert(
            "chunk_text_length".to_string(),
            json!(task.chunk_text.chars().count()),
        );
        output.insert(
            "method_set_count".to_string(),
            json!(question.method_sets.len()),
        );
        if let Ok(key) = derive_key(&task.question_id) {
            output.insert("derived_key".to_string(), json!(key));
        }

        TaskResult::succeeded(task, output)
            .with_execution_time_ms(0.0)
            .with_metadata("dry_run", true)
            .with_metadata("level", task.level())
    }

    /// Aggregate simulated results by level.
    pub fn summarize(&self, plan: &ExecutionPlan, results: &[TaskResult]) -> DryRunSummary {
        let levels_by_task: BTreeMap<&str, u32> = plan
            .tasks
            .iter()
            .map(|t| (t.task_id.as_str(), t.level()))
            .collect();
        let mut levels: BTreeMap<u32, DryRunLevel> = BTreeMap::new();
        for result in results {
            let level = levels_by_task
                .get(result.task_id.as_str())
                .copied()
                .unwrap_or(crate::plan::DEFAULT_LEVEL);
            let entry = levels.entry(level).or_insert_with(|| DryRunLevel {
                level,
                ..DryRunLevel::default()
            });
            entry.task_count += 1;
            if result.success {
                entry.estimated_time_ms += result
                    .output
                    .get("estimated_time_ms")
                    .and_then(serde_json::Value::as_f64)
                    .unwrap_or(0.0);
            } else {
                entry.invalid_count += 1;
            }
        }

        let levels: Vec<DryRunLevel> = levels.into_values().collect();
        DryRunSummary {
            plan_id: plan.plan_id.clone(),
            task_count: levels.iter().map(|l| l.task_count).sum(),
            invalid_count: levels.iter().map(|l| l.invalid_count).sum(),
            estimated_time_ms: levels.iter().map(|l| l.estimated_time_ms).sum(),
            levels,
        }
    }
}
