//! Environment source: `STRATA__EXECUTOR__MAX_WORKERS=8` sets `executor.max_workers`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("STRATA")
            .separator("__")
            .try_parsing(true),
    )
}
