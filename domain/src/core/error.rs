//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool definition: {0}")]
    InvalidTool(String),
}

impl DomainError {
    /// Check if this error is a registry miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::ToolNotFound(_))
    }
}
