//! Presentation: text tables and JSON renderings of command results.

use crate::error::ExecutionError;
use crate::execution::DryRunSummary;
use crate::plan::{ExecutionPlan, TaskResult};
use comfy_table::Table;
use serde_json::json;

fn to_pretty_json(value: &serde_json::Value) -> Result<String, ExecutionError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ExecutionError::InvalidPlan(format!("Failed to render JSON: {}", e)))
}

pub fn format_dry_run_text(summary: &DryRunSummary, results: &[TaskResult]) -> String {
    let mut tasks = Table::new();
    tasks.load_preset(comfy_table::presets::UTF8_FULL);
    tasks.set_header(vec!["Task", "Question", "Level", "Valid", "Estimate (ms)", "Error"]);
    for r in results {
        let level = r
            .metadata
            .get("level")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        let estimate = r
            .output
            .get("estimated_time_ms")
            .and_then(serde_json::Value::as_f64)
            .map(|ms| format!("{:.1}", ms))
            .unwrap_or_else(|| "-".to_string());
        let valid = if r.success { "yes" } else { "no" };
        let error = r.error.clone().unwrap_or_default();
        tasks.add_row(vec![
            r.task_id.as_str(),
            r.question_id.as_str(),
            level.as_str(),
            valid,
            estimate.as_str(),
            error.as_str(),
        ]);
    }

    let mut levels = Table::new();
    levels.load_preset(comfy_table::presets::UTF8_FULL);
    levels.set_header(vec!["Level", "Tasks", "Invalid", "Estimate (ms)"]);
    for level in &summary.levels {
        levels.add_row(vec![
            level.level.to_string(),
            level.task_count.to_string(),
            level.invalid_count.to_string(),
            format!("{:.1}", level.estimated_time_ms),
        ]);
    }

    format!(
        "Dry run for plan {}\n{}\n\n{}\n\nTasks: {}  Invalid: {}  Estimated total: {:.1} ms",
        summary.plan_id,
        tasks,
        levels,
        summary.task_count,
        summary.invalid_count,
        summary.estimated_time_ms
    )
}

pub fn format_dry_run_json(
    summary: &DryRunSummary,
    results: &[TaskResult],
) -> Result<String, ExecutionError> {
    to_pretty_json(&json!({ "summary": summary, "results": results }))
}

pub fn format_plan_validation(plan: &ExecutionPlan) -> String {
    let levels: Vec<String> = plan.levels().iter().map(u32::to_string).collect();
    format!(
        "Plan {} is valid:\n  Tasks: {}\n  Levels: {}",
        plan.plan_id,
        plan.tasks.len(),
        levels.join(", ")
    )
}

pub fn format_checkpoint_list(
    plan_ids: &[String],
    json_output: bool,
) -> Result<String, ExecutionError> {
    if json_output {
        return to_pretty_json(&json!({ "checkpoints": plan_ids }));
    }
    if plan_ids.is_empty() {
        return Ok("No checkpoints stored.".to_string());
    }
    let mut lines: Vec<String> = plan_ids
        .iter()
        .enumerate()
        .map(|(i, id)| format!("  {}. {}", i + 1, id))
        .collect();
    lines.insert(0, "Checkpoints:".to_string());
    Ok(lines.join("\n"))
}

pub(crate) fn format_checkpoint_record(record: &serde_json::Value) -> Result<String, ExecutionError> {
    to_pretty_json(record)
}
