//! Use cases (application services)

pub mod dispatch_action;
pub mod run_pipeline;
