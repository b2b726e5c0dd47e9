//! Tool domain module
//!
//! A *tool* is one capability (command execution, read-only query,
//! restricted evaluation, URL fetch) served by one network backend.
//! This module owns the static description of those backends.
//!
//! ```text
//! ┌──────────────┐   resolve("SYSTEM_SQLITE")   ┌──────────────────────────┐
//! │ ToolRegistry │ ───────────────────────────▶ │ ToolSpec "sql"           │
//! │ (+ aliases)  │                              │ http://localhost:8002    │
//! └──────────────┘                              │ /execute_query           │
//!                                               │ {query, db_name=system}  │
//!                                               └──────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ToolRegistry`]: logical name / alias → [`ToolSpec`]
//! - [`ToolSpec`]: address, endpoint, request schema, body field
//! - [`ToolKind`]: the four capabilities and their fence-label conventions
//! - [`ToolValidator`]: schema check for extracted payloads

pub mod builtin;
pub mod entities;
pub mod registry;
pub mod traits;

pub use entities::{ToolKind, ToolParameter, ToolSpec};
pub use registry::ToolRegistry;
pub use traits::{DefaultToolValidator, ToolValidator};
