//! CLI domain: parse, route, output, and presentation only.
//! No execution logic; the route table dispatches to library services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{CheckpointCommands, Cli, Commands, ConfigCommands, OutputFormat, PlanCommands};
pub use presentation::{
    format_checkpoint_list, format_dry_run_json, format_dry_run_text, format_plan_validation,
};
pub use route::RunContext;
