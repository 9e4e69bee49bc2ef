//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("executor.max_workers", 0)?
        .set_default("executor.checkpoint_batch_size", 10)?
        .set_default("executor.checkpoint_dir", ".strata/checkpoints")?
        .set_default("executor.backend", "threads")?
        .set_default("executor.level_gate", "completion")?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")
}
