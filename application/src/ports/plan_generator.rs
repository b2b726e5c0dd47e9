//! Plan generator port
//!
//! The language model that writes the plan is an external collaborator:
//! given a system prompt and the user's request it returns free text.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanGeneratorError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("No plan generator configured")]
    NotConfigured,

    #[error("Other error: {0}")]
    Other(String),
}

#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_input: &str,
    ) -> Result<String, PlanGeneratorError>;
}
