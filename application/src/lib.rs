//! Application layer for plan-relay
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::ExecutionParams;
pub use ports::{
    backend_transport::{BackendTransport, TransportError, TransportResponse},
    plan_generator::{PlanGenerator, PlanGeneratorError},
    progress::{NoProgress, PipelineProgressNotifier},
    run_logger::{NoRunLogger, RunEvent, RunLogger},
};
pub use use_cases::dispatch_action::{DispatchActionUseCase, DispatchReport};
pub use use_cases::run_pipeline::RunPipelineUseCase;
