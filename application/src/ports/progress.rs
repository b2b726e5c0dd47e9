//! Progress notification port
//!
//! Defines the interface for reporting progress during a pipeline run.

use relay_domain::{ExecutionResult, ParsedAction, PipelineState};

/// Callback for progress updates during a pipeline run
///
/// Implementations live in the presentation layer (spinner, plain log).
pub trait PipelineProgressNotifier: Send + Sync {
    /// Called on every state transition
    fn on_state(&self, state: PipelineState);

    /// Called before each backend request; `attempt` starts at 1
    fn on_dispatch(&self, _action: &ParsedAction, _attempt: usize) {}

    /// Called once the dispatcher has a final result
    fn on_result(&self, _result: &ExecutionResult) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl PipelineProgressNotifier for NoProgress {
    fn on_state(&self, _state: PipelineState) {}
}
