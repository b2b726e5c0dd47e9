//! Pipeline output value objects

use super::state::PipelineState;
use crate::action::{ExtractionOutcome, ParsedAction};
use crate::execution::{BackendFailure, DispatchFailure, ExecutionResult};
use serde::Serialize;
use serde_json::Value;

/// The one result a caller gets from a pipeline run.
///
/// Every failure is a variant here; a run never ends in an `Err`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Success {
        tool: String,
        status_code: u16,
        body: Value,
    },
    ParseFailure {
        reason: String,
    },
    NoExecutableAction {
        reason: String,
    },
    UnknownFormat {
        raw: String,
    },
    DispatchError(DispatchFailure),
    BackendError(BackendFailure),
}

impl PipelineOutcome {
    /// Map a non-action extraction outcome. `Action` has no pipeline
    /// outcome of its own, it continues to dispatch.
    pub fn from_extraction(outcome: &ExtractionOutcome) -> Option<Self> {
        match outcome {
            ExtractionOutcome::Action(_) => None,
            ExtractionOutcome::NoExecutableAction { reason } => Some(Self::NoExecutableAction {
                reason: reason.clone(),
            }),
            ExtractionOutcome::ParseFailure { reason } => Some(Self::ParseFailure {
                reason: reason.clone(),
            }),
            ExtractionOutcome::UnknownFormat { raw } => {
                Some(Self::UnknownFormat { raw: raw.clone() })
            }
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::ParseFailure { .. } => "parse_failure",
            Self::NoExecutableAction { .. } => "no_executable_action",
            Self::UnknownFormat { .. } => "unknown_format",
            Self::DispatchError(_) => "dispatch_error",
            Self::BackendError(_) => "backend_error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// `NoExecutableAction` is a deliberate no-op, not an error.
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::Success { .. } | Self::NoExecutableAction { .. })
    }

    /// The terminal state this outcome corresponds to.
    pub fn terminal_state(&self) -> PipelineState {
        match self {
            Self::Success { .. } => PipelineState::Success,
            Self::ParseFailure { .. } => PipelineState::ParseFailure,
            Self::NoExecutableAction { .. } => PipelineState::NoExecutableAction,
            Self::UnknownFormat { .. } => PipelineState::UnknownFormat,
            Self::DispatchError(_) => PipelineState::DispatchError,
            Self::BackendError(_) => PipelineState::BackendError,
        }
    }
}

impl From<ExecutionResult> for PipelineOutcome {
    fn from(result: ExecutionResult) -> Self {
        match result {
            ExecutionResult::Success {
                tool,
                status_code,
                body,
            } => Self::Success {
                tool,
                status_code,
                body,
            },
            ExecutionResult::BackendError(failure) => Self::BackendError(failure),
            ExecutionResult::DispatchError(failure) => Self::DispatchError(failure),
        }
    }
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub outcome: PipelineOutcome,
    /// The action that was dispatched (after any retry cleanup)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ParsedAction>,
    /// Fallback steps from the plan, for display only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    /// Backend requests sent (0, 1 or 2)
    pub attempts: usize,
    pub trace: Vec<PipelineState>,
}

impl PipelineOutput {
    pub fn new(outcome: PipelineOutcome, trace: Vec<PipelineState>) -> Self {
        Self {
            outcome,
            action: None,
            fallback: None,
            attempts: 0,
            trace,
        }
    }

    pub fn with_action(mut self, action: ParsedAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_fallback(mut self, fallback: Option<String>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn final_state(&self) -> PipelineState {
        self.trace.last().copied().unwrap_or(PipelineState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::DispatchErrorKind;
    use serde_json::json;

    #[test]
    fn test_from_extraction_skips_action() {
        let outcome = ExtractionOutcome::Action(ParsedAction::new("shell"));
        assert!(PipelineOutcome::from_extraction(&outcome).is_none());

        let outcome = ExtractionOutcome::no_action("rationale only");
        let mapped = PipelineOutcome::from_extraction(&outcome).unwrap();
        assert_eq!(mapped.kind_str(), "no_executable_action");
        assert!(!mapped.is_error());
    }

    #[test]
    fn test_from_execution_result() {
        let success: PipelineOutcome = ExecutionResult::Success {
            tool: "sql".to_string(),
            status_code: 200,
            body: json!({"status": "success"}),
        }
        .into();
        assert!(success.is_success());
        assert_eq!(success.terminal_state(), PipelineState::Success);

        let dispatch: PipelineOutcome =
            ExecutionResult::DispatchError(DispatchFailure::new(DispatchErrorKind::Unreachable, "refused"))
                .into();
        assert!(dispatch.is_error());
        assert_eq!(dispatch.terminal_state(), PipelineState::DispatchError);
    }

    #[test]
    fn test_output_serialization() {
        let output = PipelineOutput::new(
            PipelineOutcome::ParseFailure {
                reason: "no primary action block".to_string(),
            },
            vec![
                PipelineState::Idle,
                PipelineState::ActionParsing,
                PipelineState::ParseFailure,
            ],
        );
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["outcome"]["outcome"], "parse_failure");
        assert_eq!(value["attempts"], 0);
        assert_eq!(value["trace"][2], "parse_failure");
        assert!(value.get("action").is_none());
        assert_eq!(output.final_state(), PipelineState::ParseFailure);
    }
}
