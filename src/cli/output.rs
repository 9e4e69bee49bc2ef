//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{CheckpointError, ExecutionError};

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &ExecutionError) -> String {
    match e {
        ExecutionError::Checkpoint(CheckpointError::Corruption { plan_id, reason }) => format!(
            "Checkpoint for plan {} failed verification: {}\nRun `strata checkpoint clear {}` to discard it.",
            plan_id, reason, plan_id
        ),
        other => other.to_string(),
    }
}
