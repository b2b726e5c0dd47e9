//! Plan entity

use serde::{Deserialize, Serialize};

/// A plan produced for one user request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Body of the primary-action section (markers removed, untrimmed lines kept)
    pub primary_action: String,
    /// Body of the fallback section, if the plan had one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl Plan {
    pub fn new(primary_action: impl Into<String>) -> Self {
        Self {
            primary_action: primary_action.into(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}
