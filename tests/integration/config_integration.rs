//! Configuration layering from workspace files.

use strata::config::ConfigLoader;
use strata::{LevelGate, PoolBackend};
use tempfile::TempDir;

#[test]
fn workspace_config_drives_executor_settings() {
    let temp = TempDir::new().unwrap();
    let config_dir = temp.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        r#"
[executor]
max_workers = 6
backend = "compute"
level_gate = "success"
checkpoint_dir = "/var/tmp/strata-checkpoints"

[logging]
format = "json"
"#,
    )
    .unwrap();

    let config = ConfigLoader::new()
        .with_global(false)
        .with_environment(false)
        .load(temp.path())
        .unwrap();

    assert_eq!(config.executor.max_workers, 6);
    assert_eq!(config.executor.resolved_max_workers(), 6);
    assert_eq!(config.executor.backend, PoolBackend::Compute);
    assert_eq!(config.executor.level_gate, LevelGate::Success);
    assert_eq!(config.executor.checkpoint_batch_size, 10);
    assert_eq!(
        config.executor.checkpoint_dir,
        std::path::PathBuf::from("/var/tmp/strata-checkpoints")
    );
    assert_eq!(config.logging.format, "json");
}

#[test]
fn missing_workspace_config_yields_defaults() {
    let temp = TempDir::new().unwrap();
    let config = ConfigLoader::new()
        .with_global(false)
        .with_environment(false)
        .load(temp.path())
        .unwrap();
    assert_eq!(config, strata::config::StrataConfig::default());
}

#[test]
fn config_dir_overrides_root_strata_toml() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("strata.toml"),
        "[executor]\nmax_workers = 3\ncheckpoint_batch_size = 5\n",
    )
    .unwrap();
    let config_dir = temp.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "[executor]\nmax_workers = 8\n").unwrap();

    let config = ConfigLoader::new()
        .with_global(false)
        .with_environment(false)
        .load(temp.path())
        .unwrap();

    assert_eq!(config.executor.max_workers, 8);
    assert_eq!(config.executor.checkpoint_batch_size, 5);
}
