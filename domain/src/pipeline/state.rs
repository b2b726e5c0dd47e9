//! Per-request pipeline state machine.

use serde::{Deserialize, Serialize};

/// State of one pipeline run.
///
/// ```text
/// Idle → PlanRequested → ActionParsing → { NoExecutableAction | ParseFailure | UnknownFormat | Resolved }
/// Resolved → Dispatching → { Success | BackendError | DispatchError }
///                 └──▶ Retrying (at most once) → { Success | BackendError | DispatchError }
/// ```
///
/// A run over plan text that was supplied directly goes `Idle → ActionParsing`.
/// A plan generator failure ends the run at `PlanRequested → ParseFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    PlanRequested,
    ActionParsing,
    NoExecutableAction,
    ParseFailure,
    UnknownFormat,
    Resolved,
    Dispatching,
    Retrying,
    Success,
    BackendError,
    DispatchError,
}

impl PipelineState {
    pub fn as_str(&self) -> &str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::PlanRequested => "plan_requested",
            PipelineState::ActionParsing => "action_parsing",
            PipelineState::NoExecutableAction => "no_executable_action",
            PipelineState::ParseFailure => "parse_failure",
            PipelineState::UnknownFormat => "unknown_format",
            PipelineState::Resolved => "resolved",
            PipelineState::Dispatching => "dispatching",
            PipelineState::Retrying => "retrying",
            PipelineState::Success => "success",
            PipelineState::BackendError => "backend_error",
            PipelineState::DispatchError => "dispatch_error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::NoExecutableAction
                | PipelineState::ParseFailure
                | PipelineState::UnknownFormat
                | PipelineState::Success
                | PipelineState::BackendError
                | PipelineState::DispatchError
        )
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        match self {
            Idle => matches!(next, PlanRequested | ActionParsing),
            PlanRequested => matches!(next, ActionParsing | ParseFailure),
            ActionParsing => matches!(
                next,
                NoExecutableAction | ParseFailure | UnknownFormat | Resolved
            ),
            Resolved => next == Dispatching,
            Dispatching => matches!(next, Retrying | Success | BackendError | DispatchError),
            Retrying => matches!(next, Success | BackendError | DispatchError),
            _ => false,
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The ordered list of states one run went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTrace {
    states: Vec<PipelineState>,
}

impl StateTrace {
    pub fn new() -> Self {
        Self {
            states: vec![PipelineState::Idle],
        }
    }

    /// Record a transition. Illegal transitions are a programming error.
    pub fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.current().can_transition_to(next),
            "illegal pipeline transition {} -> {}",
            self.current(),
            next
        );
        self.states.push(next);
    }

    pub fn current(&self) -> PipelineState {
        self.states
            .last()
            .copied()
            .unwrap_or(PipelineState::Idle)
    }

    pub fn states(&self) -> &[PipelineState] {
        &self.states
    }

    pub fn retried(&self) -> bool {
        self.states.contains(&PipelineState::Retrying)
    }

    pub fn into_states(self) -> Vec<PipelineState> {
        self.states
    }
}

impl Default for StateTrace {
    fn default() -> Self {
        Self::new()
    }
}
