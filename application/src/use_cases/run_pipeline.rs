//! Run Pipeline use case.
//!
//! One user request end to end: ask the plan generator for a plan, split it,
//! extract the primary action, dispatch it. Whatever happens, the caller gets
//! a [`PipelineOutput`]; no failure escapes as an `Err`.

use crate::config::ExecutionParams;
use crate::ports::backend_transport::BackendTransport;
use crate::ports::plan_generator::{PlanGenerator, PlanGeneratorError};
use crate::ports::progress::PipelineProgressNotifier;
use crate::ports::run_logger::{NoRunLogger, RunEvent, RunLogger};
use crate::use_cases::dispatch_action::DispatchActionUseCase;
use relay_domain::{
    ActionExtractor, ExtractionOutcome, PipelineOutcome, PipelineOutput, PipelineState,
    StateTrace, ToolRegistry, system_prompt,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Use case for running the plan-to-action pipeline.
pub struct RunPipelineUseCase {
    registry: Arc<ToolRegistry>,
    dispatcher: DispatchActionUseCase,
    plan_generator: Option<Arc<dyn PlanGenerator>>,
    run_logger: Arc<dyn RunLogger>,
}

impl RunPipelineUseCase {
    pub fn new(
        registry: Arc<ToolRegistry>,
        transport: Arc<dyn BackendTransport>,
        params: ExecutionParams,
    ) -> Self {
        Self {
            dispatcher: DispatchActionUseCase::new(registry.clone(), transport, params),
            registry,
            plan_generator: None,
            run_logger: Arc::new(NoRunLogger),
        }
    }

    pub fn with_plan_generator(mut self, generator: Arc<dyn PlanGenerator>) -> Self {
        self.plan_generator = Some(generator);
        self
    }

    /// Create with a run logger (shared with the dispatcher).
    pub fn with_run_logger(mut self, logger: Arc<dyn RunLogger>) -> Self {
        self.dispatcher = self.dispatcher.with_run_logger(logger.clone());
        self.run_logger = logger;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Generate a plan for `user_input`, then run it.
    pub async fn run(
        &self,
        user_input: &str,
        progress: &dyn PipelineProgressNotifier,
    ) -> PipelineOutput {
        let mut trace = StateTrace::new();
        advance(&mut trace, progress, PipelineState::PlanRequested);
        info!("Requesting plan");

        let generated = match &self.plan_generator {
            Some(generator) => {
                generator
                    .generate(&system_prompt(&self.registry), user_input)
                    .await
            }
            None => Err(PlanGeneratorError::NotConfigured),
        };

        match generated {
            Ok(plan_text) => {
                debug!("Plan text:\n{}", plan_text);
                self.process(trace, &plan_text, progress).await
            }
            Err(e) => {
                warn!("Plan generation failed: {}", e);
                let outcome = PipelineOutcome::ParseFailure {
                    reason: format!("plan generation failed: {}", e),
                };
                self.finish(trace, outcome, progress)
            }
        }
    }

    /// Run plan text that was produced elsewhere (file, stdin, another tool).
    pub async fn run_plan_text(
        &self,
        plan_text: &str,
        progress: &dyn PipelineProgressNotifier,
    ) -> PipelineOutput {
        self.process(StateTrace::new(), plan_text, progress).await
    }

    async fn process(
        &self,
        mut trace: StateTrace,
        plan_text: &str,
        progress: &dyn PipelineProgressNotifier,
    ) -> PipelineOutput {
        advance(&mut trace, progress, PipelineState::ActionParsing);

        let extractor = ActionExtractor::new(&self.registry);
        let (extraction, fallback) = extractor.extract_with_fallback(plan_text);
        info!("Extraction: {}", extraction.kind_str());

        let action = match extraction {
            ExtractionOutcome::Action(action) => action,
            other => {
                let outcome = PipelineOutcome::from_extraction(&other)
                    .unwrap_or_else(|| PipelineOutcome::ParseFailure {
                        reason: "extraction produced no outcome".to_string(),
                    });
                let output = self.finish(trace, outcome, progress);
                return output.with_fallback(fallback);
            }
        };

        advance(&mut trace, progress, PipelineState::Resolved);
        advance(&mut trace, progress, PipelineState::Dispatching);

        let report = self.dispatcher.execute_with_progress(&action, progress).await;
        if report.retried() {
            trace.advance(PipelineState::Retrying);
        }

        let attempts = report.attempts;
        let output = self.finish(trace, report.result.into(), progress);
        output
            .with_action(report.action)
            .with_fallback(fallback)
            .with_attempts(attempts)
    }

    fn finish(
        &self,
        mut trace: StateTrace,
        outcome: PipelineOutcome,
        progress: &dyn PipelineProgressNotifier,
    ) -> PipelineOutput {
        advance(&mut trace, progress, outcome.terminal_state());
        info!("Pipeline finished: {}", outcome.kind_str());
        PipelineOutput::new(outcome, trace.into_states())
    }

    /// Record the finished run. Called by whoever owns the final output.
    pub fn log_run(&self, output: &PipelineOutput) {
        self.run_logger.log(RunEvent::new(
            "pipeline_run",
            json!({
                "tool": output.action.as_ref().map(|a| a.tool.clone()),
                "outcome": output.outcome.kind_str(),
                "attempts": output.attempts,
                "trace": output.trace,
            }),
        ));
    }
}

fn advance(trace: &mut StateTrace, progress: &dyn PipelineProgressNotifier, state: PipelineState) {
    trace.advance(state);
    progress.on_state(state);
}
