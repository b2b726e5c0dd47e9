//! Application-level configuration.
//!
//! - [`ExecutionParams`]: dispatcher control (request timeout, retry switch)

pub mod execution_params;

pub use execution_params::ExecutionParams;
