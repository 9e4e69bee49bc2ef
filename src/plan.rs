//! Plan model: tasks, plans, per-task results and the context handed to executors.

use crate::error::ExecutionError;
use crate::question::QuestionRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// JSON object used for task signals, outputs and metadata.
pub type Map = serde_json::Map<String, Value>;

/// Level assigned to tasks that do not declare one.
pub const DEFAULT_LEVEL: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutableTask {
    pub task_id: String,
    pub question_id: String,
    #[serde(default)]
    pub question_global: i64,
    #[serde(default)]
    pub policy_area_id: String,
    #[serde(default)]
    pub dimension_id: String,
    #[serde(default)]
    pub chunk_id: String,
    #[serde(default)]
    pub chunk_text: String,
    #[serde(default)]
    pub patterns: Vec<Value>,
    #[serde(default)]
    pub signals: Map,
    #[serde(default)]
    pub expected_elements: Vec<Value>,
    #[serde(default)]
    pub correlation_id: String,
    #[serde(default)]
    pub metadata: Map,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

impl ExecutableTask {
    /// Minimal task with empty payload fields.
    pub fn new(task_id: impl Into<String>, question_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            question_id: question_id.into(),
            question_global: 0,
            policy_area_id: String::new(),
            dimension_id: String::new(),
            chunk_id: String::new(),
            chunk_text: String::new(),
            patterns: Vec::new(),
            signals: Map::new(),
            expected_elements: Vec::new(),
            correlation_id: String::new(),
            metadata: Map::new(),
            level: None,
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    /// Epistemic level, defaulting to 1 when absent.
    pub fn level(&self) -> u32 {
        self.level.unwrap_or(DEFAULT_LEVEL)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionPlan {
    pub plan_id: String,
    #[serde(default)]
    pub correlation_id: String,
    pub tasks: Vec<ExecutableTask>,
}

impl ExecutionPlan {
    pub fn new(plan_id: impl Into<String>, tasks: Vec<ExecutableTask>) -> Self {
        Self {
            plan_id: plan_id.into(),
            correlation_id: String::new(),
            tasks,
        }
    }

    /// Load a plan from a JSON file. The plan is validated before it is returned.
    pub fn from_json_file(path: &Path) -> Result<Self, ExecutionError> {
        let raw = std::fs::read_to_string(path)?;
        let plan: ExecutionPlan = serde_json::from_str(&raw).map_err(|e| {
            ExecutionError::InvalidPlan(format!("Failed to parse plan {:?}: {}", path, e))
        })?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<(), ExecutionError> {
        if self.plan_id.trim().is_empty() {
            return Err(ExecutionError::InvalidPlan(
                "Execution plan id cannot be empty".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(self.tasks.len());
        for task in &self.tasks {
            if !seen.insert(task.task_id.as_str()) {
                return Err(ExecutionError::InvalidPlan(format!(
                    "Duplicate task_id {} in plan {}",
                    task.task_id, self.plan_id
                )));
            }
            if task.level == Some(0) {
                return Err(ExecutionError::InvalidPlan(format!(
                    "Task {} declares level 0; levels start at 1",
                    task.task_id
                )));
            }
        }
        Ok(())
    }

    /// Distinct levels in ascending order.
    pub fn levels(&self) -> Vec<u32> {
        let mut levels: Vec<u32> = self.tasks.iter().map(ExecutableTask::level).collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskResult {
    pub task_id: String,
    pub question_id: String,
    pub question_global: i64,
    pub policy_area_id: String,
    pub dimension_id: String,
    pub chunk_id: String,
    pub success: bool,
    pub output: Map,
    pub error: Option<String>,
    pub execution_time_ms: Option<f64>,
    pub metadata: Map,
}

impl TaskResult {
    pub fn succeeded(task: &ExecutableTask, output: Map) -> Self {
        Self::from_task(task, true, output, None)
    }

    pub fn failed(task: &ExecutableTask, error: impl Into<String>) -> Self {
        let mut message = error.into();
        if message.is_empty() {
            message = "task failed without an error message".to_string();
        }
        Self::from_task(task, false, Map::new(), Some(message))
    }

    pub fn with_execution_time_ms(mut self, millis: f64) -> Self {
        self.execution_time_ms = Some(millis);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    fn from_task(task: &ExecutableTask, success: bool, output: Map, error: Option<String>) -> Self {
        Self {
            task_id: task.task_id.clone(),
            question_id: task.question_id.clone(),
            question_global: task.question_global,
            policy_area_id: task.policy_area_id.clone(),
            dimension_id: task.dimension_id.clone(),
            chunk_id: task.chunk_id.clone(),
            success,
            output,
            error,
            execution_time_ms: None,
            metadata: Map::new(),
        }
    }
}

/// Everything an executor gets to see about the task it runs.
#[derive(Debug, Clone, Copy)]
pub struct TaskContext<'a> {
    pub plan_id: &'a str,
    pub plan_correlation_id: &'a str,
    pub task: &'a ExecutableTask,
    pub question: &'a QuestionRecord,
    pub derived_key: &'a str,
}
