//! Pipeline domain module
//!
//! State machine and result types for one plan-to-action run. The
//! orchestration itself lives in the application layer
//! (`RunPipelineUseCase`); this module only defines what a run may pass
//! through and what it returns.

pub mod outcome;
pub mod state;

pub use outcome::{PipelineOutcome, PipelineOutput};
pub use state::{PipelineState, StateTrace};
