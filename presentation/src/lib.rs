//! Presentation layer for plan-relay
//!
//! This crate contains CLI definitions, output formatters,
//! and progress reporters.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, Command, OutputFormat, ServeTarget};
pub use output::{ConsoleFormatter, OutputFormatter};
pub use progress::reporter::{ProgressReporter, SimpleProgress};
