//! Execution domain module
//!
//! The result of dispatching one [`ParsedAction`](crate::action::ParsedAction)
//! to its backend, the classification of backend rejections, and the single
//! retry rule.

pub mod codes;
pub mod retry;
pub mod value_objects;

pub use retry::{MAX_RETRIES, is_retryable_rejection, retry_action};
pub use value_objects::{
    BackendErrorKind, BackendFailure, DispatchErrorKind, DispatchFailure, ExecutionResult,
};
