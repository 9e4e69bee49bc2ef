//! Integration tests for the strata execution engine

mod checkpoint_store;
mod config_integration;
mod dry_run;
mod level_scheduler;
