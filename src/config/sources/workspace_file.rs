//! Workspace config files.
//!
//! Lowest to highest precedence: `strata.toml` at the workspace root,
//! `config/config.toml`, then `config/{STRATA_ENV}.toml` (default env
//! `development`). Only files that exist are added.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DEFAULT_ENV: &str = "development";

/// Environment name from `STRATA_ENV`. Names that could point outside the
/// `config/` directory fall back to the default.
fn environment_name() -> String {
    match std::env::var("STRATA_ENV") {
        Ok(name) if is_valid_env_name(&name) => name,
        Ok(name) => {
            warn!(env = %name, "Ignoring invalid STRATA_ENV; using {}", DEFAULT_ENV);
            DEFAULT_ENV.to_string()
        }
        Err(_) => DEFAULT_ENV.to_string(),
    }
}

fn is_valid_env_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Candidate files for `workspace_root` and `env_name`, in precedence order.
pub fn workspace_config_paths(workspace_root: &Path, env_name: &str) -> Vec<PathBuf> {
    let config_dir = workspace_root.join("config");
    vec![
        workspace_root.join("strata.toml"),
        config_dir.join("config.toml"),
        config_dir.join(format!("{}.toml", env_name)),
    ]
}

pub fn add_to_builder(
    mut builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    for path in workspace_config_paths(workspace_root, &environment_name()) {
        if path.is_file() {
            debug!(config_path = %path.display(), "Adding workspace configuration");
            builder = builder.add_source(File::from(path).required(false));
        }
    }
    Ok(builder)
}
