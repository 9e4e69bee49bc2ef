//! Checkpoint store persistence and integrity checks.

use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use strata::{CheckpointError, CheckpointRecord, CheckpointStore};
use tempfile::TempDir;

fn ids(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn save_then_resume_round_trips_across_store_instances() {
    let temp = TempDir::new().unwrap();
    let completed = ids(&["t3", "t1", "t2"]);
    {
        let store = CheckpointStore::new(temp.path()).unwrap();
        store
            .save("plan-1", &completed, BTreeMap::from([("run".to_string(), json!(1))]))
            .unwrap();
    }

    let reopened = CheckpointStore::new(temp.path()).unwrap();
    assert_eq!(reopened.resume("plan-1").unwrap(), Some(completed));
    assert_eq!(reopened.resume("plan-2").unwrap(), None);
}

#[test]
fn record_on_disk_has_documented_shape() {
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path()).unwrap();
    let path = store
        .save("plan-shape", &ids(&["b", "a"]), BTreeMap::new())
        .unwrap();
    assert_eq!(path, temp.path().join("plan-shape.checkpoint.json"));

    let record: CheckpointRecord =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(record.plan_id, "plan-shape");
    assert_eq!(
        record.completed_tasks.iter().collect::<Vec<_>>(),
        vec!["a", "b"]
    );
    assert_eq!(record.checkpoint_hash.len(), 64);
    assert!(record.verify().is_ok());
    assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp).is_ok());
}

#[test]
fn clear_reports_whether_a_record_existed() {
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path()).unwrap();
    store.save("plan-c", &ids(&["x"]), BTreeMap::new()).unwrap();

    assert!(store.clear("plan-c").unwrap());
    assert!(!store.clear("plan-c").unwrap());
    assert_eq!(store.resume("plan-c").unwrap(), None);
}

#[test]
fn tampered_fields_are_detected() {
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path()).unwrap();
    let path = store
        .save("plan-t", &ids(&["t1"]), BTreeMap::from([("attempt".to_string(), json!(1))]))
        .unwrap();
    let original = std::fs::read_to_string(&path).unwrap();

    let edits = [
        original.replace("\"t1\"", "\"t2\""),
        original.replace("\"attempt\": 1", "\"attempt\": 2"),
        original.replacen("20", "19", 1),
        original.replace("\"plan_id\": \"plan-t\"", "\"plan_id\": \"plan-u\""),
        "{ not json".to_string(),
    ];
    for edited in edits {
        assert_ne!(edited, original);
        std::fs::write(&path, &edited).unwrap();
        match store.resume("plan-t") {
            Err(CheckpointError::Corruption { .. }) => {}
            other => panic!("expected corruption for {:?}, got {:?}", edited, other),
        }
    }
}

#[test]
fn list_and_inspect() {
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path()).unwrap();
    store.save("zeta", &ids(&["1"]), BTreeMap::new()).unwrap();
    store.save("alpha", &ids(&["1", "2"]), BTreeMap::new()).unwrap();
    std::fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

    assert_eq!(store.list().unwrap(), vec!["alpha", "zeta"]);
    let raw = store.inspect("alpha").unwrap().unwrap();
    assert_eq!(raw["completed_tasks"], json!(["1", "2"]));
    assert!(store.inspect("missing").unwrap().is_none());
}

#[test]
fn blank_plan_ids_are_rejected() {
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path()).unwrap();
    for bad in ["", " \t"] {
        assert!(matches!(
            store.save(bad, &ids(&["t"]), BTreeMap::new()),
            Err(CheckpointError::InvalidPlanId(_))
        ));
    }
}

#[test]
fn slash_in_plan_id_is_stored_as_single_file() {
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path()).unwrap();
    let path = store
        .save("region/2024", &ids(&["t1"]), BTreeMap::new())
        .unwrap();

    assert_eq!(path.parent(), Some(temp.path()));
    assert_eq!(store.resume("region/2024").unwrap(), Some(ids(&["t1"])));
    assert_eq!(store.list().unwrap(), vec!["region/2024"]);
    assert!(store.clear("region/2024").unwrap());
}

#[test]
fn float_metadata_rewritten_in_equivalent_notation_is_detected() {
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path()).unwrap();
    let metadata = BTreeMap::from([
        ("ratio".to_string(), json!(2.0)),
        ("weight".to_string(), json!(20.0)),
    ]);
    let path = store.save("plan-f", &ids(&["t1"]), metadata).unwrap();
    let original = std::fs::read_to_string(&path).unwrap();

    let edits = [
        original.replace("\"ratio\": 2.0", "\"ratio\": 2e0"),
        original.replace("\"weight\": 20.0", "\"weight\": 20e0"),
        original.replace("\"weight\": 20.0", "\"weight\": 2e1"),
    ];
    for edited in edits {
        assert_ne!(edited, original);
        std::fs::write(&path, &edited).unwrap();
        assert!(
            store.resume("plan-f").unwrap_err().is_corruption(),
            "edit not detected: {edited}"
        );
    }
}
