//! Action domain entities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single executable action extracted from a plan.
///
/// The payload is an ordered map, so two extractions of the same plan text
/// compare and serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedAction {
    /// Canonical tool name (e.g., "sql")
    pub tool: String,
    /// Request fields sent to the backend
    pub payload: Map<String, Value>,
}

impl ParsedAction {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            payload: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }

    /// Payload as a JSON object, ready to send
    pub fn payload_value(&self) -> Value {
        Value::Object(self.payload.clone())
    }
}

/// Result of running the extractor over a plan.
///
/// Exactly one variant is produced per plan; an action is never partially
/// populated. Only [`ExtractionOutcome::Action`] leads to a dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// A well-formed action for a registered tool
    Action(ParsedAction),
    /// The model deliberately chose not to act (not an error)
    NoExecutableAction { reason: String },
    /// The text does not follow the plan contract
    ParseFailure { reason: String },
    /// A primary-action block exists but maps to no known tool
    UnknownFormat { raw: String },
}

impl ExtractionOutcome {
    pub fn no_action(reason: impl Into<String>) -> Self {
        Self::NoExecutableAction {
            reason: reason.into(),
        }
    }

    pub fn parse_failure(reason: impl Into<String>) -> Self {
        Self::ParseFailure {
            reason: reason.into(),
        }
    }

    pub fn unknown_format(raw: impl Into<String>) -> Self {
        Self::UnknownFormat { raw: raw.into() }
    }

    pub fn action(&self) -> Option<&ParsedAction> {
        match self {
            Self::Action(action) => Some(action),
            _ => None,
        }
    }

    pub fn into_action(self) -> Option<ParsedAction> {
        match self {
            Self::Action(action) => Some(action),
            _ => None,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Action(_) => "action",
            Self::NoExecutableAction { .. } => "no_executable_action",
            Self::ParseFailure { .. } => "parse_failure",
            Self::UnknownFormat { .. } => "unknown_format",
        }
    }
}
