//! Domain layer for plan-relay
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns, and
//! performs no I/O.
//!
//! # Core Concepts
//!
//! ## Plan
//!
//! A language model answers a request with structured text: a
//! `PRIMARY ACTION` section holding one command, optionally followed by
//! `FALLBACK STEPS`. Only the primary action is ever executed.
//!
//! ## Tool
//!
//! One capability (shell, sql, eval, fetch) served by one network backend.
//! The [`ToolRegistry`] maps logical names and aliases to a [`ToolSpec`].
//!
//! ## Action
//!
//! The [`ActionExtractor`] turns a plan into exactly one
//! [`ExtractionOutcome`]; only [`ExtractionOutcome::Action`] is dispatched.

pub mod action;
pub mod core;
pub mod execution;
pub mod pipeline;
pub mod plan;
pub mod tool;

// Re-export commonly used types
pub use action::{
    ActionExtractor, ExtractionOutcome, ParsedAction, extractor::looks_like_prose,
    secondary_cleanup,
};
pub use core::{
    error::DomainError,
    validation::{ConfigIssue, ConfigIssueCode, Severity},
};
pub use execution::{
    BackendErrorKind, BackendFailure, DispatchErrorKind, DispatchFailure, ExecutionResult,
    codes, is_retryable_rejection, retry_action,
};
pub use pipeline::{PipelineOutcome, PipelineOutput, PipelineState, StateTrace};
pub use plan::{Plan, split_plan, system_prompt};
pub use tool::{
    DefaultToolValidator, ToolKind, ToolParameter, ToolRegistry, ToolSpec, ToolValidator,
    builtin::{DEFAULT_DB_NAME, builtin_spec},
};
