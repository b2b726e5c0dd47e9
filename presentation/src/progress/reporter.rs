//! Progress reporting for pipeline runs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use relay_application::PipelineProgressNotifier;
use relay_domain::{ExecutionResult, ParsedAction, PipelineState};
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with a spinner on stderr
pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn state_message(state: PipelineState) -> Option<&'static str> {
        match state {
            PipelineState::PlanRequested => Some("Requesting plan..."),
            PipelineState::ActionParsing => Some("Extracting action..."),
            PipelineState::Resolved => Some("Resolving tool..."),
            PipelineState::Dispatching => Some("Calling backend..."),
            PipelineState::Retrying => Some("Retrying with cleaned payload..."),
            _ => None,
        }
    }

    fn with_spinner(&self, f: impl FnOnce(&ProgressBar)) {
        let Ok(mut guard) = self.spinner.lock() else {
            return;
        };
        let pb = guard.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::spinner_style());
            pb.set_prefix("plan-relay");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        f(pb);
    }

    fn finish(&self, line: String) {
        if let Ok(mut guard) = self.spinner.lock()
            && let Some(pb) = guard.take()
        {
            pb.finish_and_clear();
        }
        eprintln!("{}", line);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineProgressNotifier for ProgressReporter {
    fn on_state(&self, state: PipelineState) {
        if let Some(message) = Self::state_message(state) {
            self.with_spinner(|pb| pb.set_message(message));
        } else if state.is_terminal() {
            let label = state.as_str().replace('_', " ");
            let line = match state {
                PipelineState::Success => format!("{} {}", "v".green(), label),
                PipelineState::NoExecutableAction => format!("{} {}", "-".yellow(), label),
                _ => format!("{} {}", "x".red(), label),
            };
            self.finish(line);
        }
    }

    fn on_dispatch(&self, action: &ParsedAction, attempt: usize) {
        let message = if attempt > 1 {
            format!("Calling {} (attempt {})...", action.tool, attempt)
        } else {
            format!("Calling {}...", action.tool)
        };
        self.with_spinner(|pb| pb.set_message(message));
    }
}

/// Simple text-based progress (no spinner)
pub struct SimpleProgress;

impl PipelineProgressNotifier for SimpleProgress {
    fn on_state(&self, state: PipelineState) {
        if state == PipelineState::Idle {
            return;
        }
        let label = state.as_str();
        if state == PipelineState::Success {
            eprintln!("{} {}", "->".green(), label);
        } else if state.is_terminal() {
            eprintln!("{} {}", "->".red(), label);
        } else {
            eprintln!("{} {}", "->".dimmed(), label);
        }
    }

    fn on_dispatch(&self, action: &ParsedAction, attempt: usize) {
        eprintln!("   {} {} (attempt {})", "POST".cyan(), action.tool, attempt);
    }

    fn on_result(&self, result: &ExecutionResult) {
        eprintln!("   {} {}", "result:".dimmed(), result.kind_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_messages_cover_active_states() {
        assert!(ProgressReporter::state_message(PipelineState::Dispatching).is_some());
        assert!(ProgressReporter::state_message(PipelineState::Retrying).is_some());
        assert!(ProgressReporter::state_message(PipelineState::Success).is_none());
    }

    #[test]
    fn test_reporter_finishes_spinner_on_terminal_state() {
        let reporter = ProgressReporter::new();
        reporter.on_state(PipelineState::ActionParsing);
        assert!(reporter.spinner.lock().unwrap().is_some());
        reporter.on_state(PipelineState::Success);
        assert!(reporter.spinner.lock().unwrap().is_none());
    }
}
