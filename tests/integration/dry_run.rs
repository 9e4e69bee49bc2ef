//! Dry runs never invoke task logic.

use std::sync::Arc;
use strata::{
    CostModel, DryRunSimulator, ExecutableTask, ExecutionPlan, InMemoryQuestionIndex,
};

const CATALOG: &str = r#"[
    {"question_id": "Q001", "question_text": "Baseline?", "method_sets": ["a", "b", "c"]},
    {"question_id": "Q002", "question_text": "Targets?"}
]"#;

#[test]
fn dry_run_uses_configured_cost_model() {
    let questions = InMemoryQuestionIndex::from_json_str(CATALOG).unwrap();
    let model = CostModel {
        base_ms: 100.0,
        per_method_set_ms: 1.0,
        ..CostModel::default()
    };
    let simulator = DryRunSimulator::with_cost_model(Arc::new(questions), model);

    let mut chunked = ExecutableTask::new("t2", "Q002").with_level(2);
    chunked.chunk_text = "abcd".repeat(50);
    let plan = ExecutionPlan::new(
        "plan-dry",
        vec![ExecutableTask::new("t1", "Q001"), chunked, ExecutableTask::new("t3", "bad")],
    );

    let results = simulator.simulate(&plan).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].output["estimated_time_ms"], serde_json::json!(103.0));
    assert_eq!(results[1].output["chunk_text_length"], serde_json::json!(200));
    assert!(!results[2].success);
    assert!(results.iter().all(|r| r.metadata["dry_run"] == true));

    let summary = simulator.summarize(&plan, &results);
    assert_eq!(summary.levels.len(), 2);
    assert_eq!(summary.levels[0].task_count, 2);
    assert_eq!(summary.levels[0].invalid_count, 1);
    assert_eq!(summary.invalid_count, 1);
}
