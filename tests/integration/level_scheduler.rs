//! Level scheduler behavior: ordering, barriers, failure isolation, gating.

use super::test_utils::{catalog, recording_executor, task, timestamp, InvocationLog};
use std::sync::Arc;
use strata::{
    executor_fn, CheckpointStore, ExecutionPlan, ExecutorConfig, LevelGate, LevelScheduler,
    Map, PoolBackend, SharedExecutor, TaskContext,
};
use tempfile::TempDir;

fn scheduler_with(
    temp: &TempDir,
    config: ExecutorConfig,
    executor: Arc<dyn strata::TaskExecutor>,
) -> (LevelScheduler, Arc<CheckpointStore>) {
    let store = Arc::new(CheckpointStore::new(temp.path().join("checkpoints")).unwrap());
    let scheduler = LevelScheduler::new(
        config,
        Arc::clone(&store),
        catalog(40),
        Arc::new(SharedExecutor(executor)),
    );
    (scheduler, store)
}

fn two_level_plan() -> ExecutionPlan {
    ExecutionPlan::new(
        "plan-two-levels",
        vec![
            task("A", "Q001", 1),
            task("B", "Q002", 1),
            task("C", "Q003", 1),
            task("D", "Q004", 2),
            task("E", "Q005", 2),
        ],
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_task_does_not_stop_its_level_or_the_next() {
    let temp = TempDir::new().unwrap();
    let log = Arc::new(InvocationLog::default());
    let config = ExecutorConfig {
        max_workers: 3,
        ..ExecutorConfig::default()
    };
    let (scheduler, store) = scheduler_with(&temp, config, recording_executor(log.clone(), &["B"]));

    let results = scheduler.execute(&two_level_plan()).await.unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.task_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C", "D", "E"]);
    for result in &results {
        if result.task_id == "B" {
            assert!(!result.success);
            assert!(!result.error.as_deref().unwrap_or("").is_empty());
        } else {
            assert!(result.success, "{} should succeed", result.task_id);
            assert!(result.error.is_none());
            assert!(result.execution_time_ms.unwrap() > 0.0);
        }
    }
    assert_eq!(log.total(), 5);
    assert!(store.resume("plan-two-levels").unwrap().is_none(), "checkpoint cleared");
}

#[tokio::test(flavor = "multi_thread")]
async fn next_level_starts_after_previous_level_finishes() {
    let temp = TempDir::new().unwrap();
    let log = Arc::new(InvocationLog::default());
    let config = ExecutorConfig {
        max_workers: 4,
        ..ExecutorConfig::default()
    };
    let (scheduler, _store) = scheduler_with(&temp, config, recording_executor(log, &["B"]));

    let results = scheduler.execute(&two_level_plan()).await.unwrap();

    let level_one_done = results[..3]
        .iter()
        .map(|r| timestamp(r, "finished_at"))
        .max()
        .unwrap();
    for result in &results[3..] {
        assert!(
            timestamp(result, "started_at") >= level_one_done,
            "{} started before level 1 completed",
            result.task_id
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn levels_run_in_ascending_order_regardless_of_plan_order() {
    let temp = TempDir::new().unwrap();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen = Arc::clone(&order);
    let executor = executor_fn(move |ctx: &TaskContext<'_>| {
        seen.lock().push(ctx.task.level());
        Ok(Map::new())
    });
    let config = ExecutorConfig {
        max_workers: 2,
        ..ExecutorConfig::default()
    };
    let (scheduler, _store) = scheduler_with(&temp, config, executor);

    let plan = ExecutionPlan::new(
        "plan-unordered",
        vec![
            task("late", "Q001", 3),
            task("early", "Q002", 1),
            strata::ExecutableTask::new("default", "Q003"),
            task("middle", "Q004", 2),
        ],
    );
    let results = scheduler.execute(&plan).await.unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.task_id.as_str()).collect();
    assert_eq!(ids, vec!["late", "early", "default", "middle"]);
    let levels = order.lock().clone();
    let mut sorted = levels.clone();
    sorted.sort_unstable();
    assert_eq!(levels, sorted);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_questions_and_bad_ids_become_failed_results() {
    let temp = TempDir::new().unwrap();
    let log = Arc::new(InvocationLog::default());
    let (scheduler, _store) =
        scheduler_with(&temp, ExecutorConfig::default(), recording_executor(log.clone(), &[]));

    let plan = ExecutionPlan::new(
        "plan-bad-questions",
        vec![task("ok", "Q001", 1), task("missing", "Q999", 1)],
    );
    let results = scheduler.execute(&plan).await.unwrap();

    assert!(results[0].success);
    assert_eq!(results[0].metadata["derived_key"], "D1-Q1");
    assert!(!results[1].success);
    assert!(results[1].error.as_deref().unwrap().contains("Q999"));
    assert_eq!(log.count("missing"), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_executor_is_isolated() {
    let temp = TempDir::new().unwrap();
    let executor = executor_fn(|ctx: &TaskContext<'_>| {
        if ctx.task.task_id == "boom" {
            panic!("executor exploded");
        }
        Ok(Map::new())
    });
    for backend in [PoolBackend::Threads, PoolBackend::Compute] {
        let config = ExecutorConfig {
            max_workers: 2,
            backend,
            ..ExecutorConfig::default()
        };
        let (scheduler, _store) = scheduler_with(&temp, config, Arc::clone(&executor));
        let plan = ExecutionPlan::new(
            "plan-panic",
            vec![task("fine", "Q001", 1), task("boom", "Q002", 1), task("after", "Q003", 2)],
        );
        let results = scheduler.execute(&plan).await.unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[1].error.as_deref().unwrap().contains("executor exploded"));
        assert!(results[2].success);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn compute_backend_produces_same_results() {
    let temp = TempDir::new().unwrap();
    let log = Arc::new(InvocationLog::default());
    let config = ExecutorConfig {
        max_workers: 2,
        backend: PoolBackend::Compute,
        ..ExecutorConfig::default()
    };
    let (scheduler, _store) = scheduler_with(&temp, config, recording_executor(log.clone(), &["B"]));

    let report = scheduler
        .execute_with_summary(&two_level_plan())
        .await
        .unwrap();

    assert_eq!(report.results.len(), 5);
    assert_eq!(report.total_failed(), 1);
    assert_eq!(report.level_summaries.len(), 2);
    assert_eq!(report.level_summaries[0].succeeded_count, 2);
    assert_eq!(report.level_summaries[0].failed_count, 1);
    assert_eq!(report.level_summaries[1].succeeded_count, 2);
    assert_eq!(log.total(), 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn success_gate_halts_and_keeps_checkpoint() {
    let temp = TempDir::new().unwrap();
    let log = Arc::new(InvocationLog::default());
    let config = ExecutorConfig {
        level_gate: LevelGate::Success,
        ..ExecutorConfig::default()
    };
    let (scheduler, store) = scheduler_with(&temp, config, recording_executor(log.clone(), &["B"]));

    let report = scheduler
        .execute_with_summary(&two_level_plan())
        .await
        .unwrap();

    assert_eq!(report.halted_at_level, Some(1));
    let ids: Vec<&str> = report.results.iter().map(|r| r.task_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
    assert_eq!(log.count("D"), 0);

    let completed = store.resume("plan-two-levels").unwrap().unwrap();
    assert!(completed.contains("A") && completed.contains("C"));
    assert!(!completed.contains("B"));
}

#[tokio::test(flavor = "multi_thread")]
async fn overdue_task_times_out() {
    let temp = TempDir::new().unwrap();
    let executor = executor_fn(|ctx: &TaskContext<'_>| {
        if ctx.task.task_id == "slow" {
            std::thread::sleep(std::time::Duration::from_millis(500));
        }
        Ok(Map::new())
    });
    let config = ExecutorConfig {
        max_workers: 2,
        task_timeout_ms: Some(100),
        ..ExecutorConfig::default()
    };
    let (scheduler, _store) = scheduler_with(&temp, config, executor);
    let plan = ExecutionPlan::new(
        "plan-timeout",
        vec![task("fast", "Q001", 1), task("slow", "Q002", 1)],
    );

    let results = scheduler.execute(&plan).await.unwrap();
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[1].error.as_deref().unwrap().contains("timed out"));

    let timed_out = &results[1];
    assert_eq!(timed_out.metadata["level"], 1);
    assert!(timed_out.execution_time_ms.unwrap() >= 100.0);
    assert!(timestamp(timed_out, "finished_at") >= timestamp(timed_out, "started_at"));
}

#[tokio::test(flavor = "multi_thread")]
async fn plan_id_with_separator_is_still_checkpointed() {
    let temp = TempDir::new().unwrap();
    let log = Arc::new(InvocationLog::default());
    let config = ExecutorConfig {
        checkpoint_batch_size: 1,
        level_gate: LevelGate::Success,
        ..ExecutorConfig::default()
    };
    let (scheduler, store) = scheduler_with(&temp, config, recording_executor(log.clone(), &["B"]));
    let mut plan = two_level_plan();
    plan.plan_id = "region/2024".to_string();
    plan.validate().unwrap();

    let report = scheduler.execute_with_summary(&plan).await.unwrap();

    assert_eq!(report.halted_at_level, Some(1));
    let completed = store.resume("region/2024").unwrap().unwrap();
    assert_eq!(completed.len(), 2);
    assert_eq!(store.list().unwrap(), vec!["region/2024"]);
    let files = std::fs::read_dir(store.dir()).unwrap().count();
    assert_eq!(files, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn executor_is_built_once_per_question() {
    let temp = TempDir::new().unwrap();
    let builds = Arc::new(InvocationLog::default());
    let counter = Arc::clone(&builds);
    let factory = strata::FactoryFn(
        move |question_id: &str, _key: &str| -> anyhow::Result<Arc<dyn strata::TaskExecutor>> {
            counter.record(question_id);
            Ok(executor_fn(|_ctx: &TaskContext<'_>| Ok(Map::new())))
        },
    );
    let store = Arc::new(CheckpointStore::new(temp.path()).unwrap());
    let scheduler = LevelScheduler::new(
        ExecutorConfig {
            max_workers: 4,
            ..ExecutorConfig::default()
        },
        store,
        catalog(5),
        Arc::new(factory),
    );
    let plan = ExecutionPlan::new(
        "plan-shared-question",
        (0..12u32)
            .map(|i| task(&format!("t{}", i), if i % 2 == 0 { "Q001" } else { "Q002" }, 1 + i % 3))
            .collect(),
    );

    let results = scheduler.execute(&plan).await.unwrap();
    assert!(results.iter().all(|r| r.success));
    assert_eq!(builds.count("Q001"), 1);
    assert_eq!(builds.count("Q002"), 1);
    assert_eq!(scheduler.cache().len(), 2);
}
