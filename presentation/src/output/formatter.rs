//! Output formatter trait

use relay_domain::{ExtractionOutcome, PipelineOutput, ToolRegistry};

/// Trait for formatting pipeline results
pub trait OutputFormatter {
    /// Format a finished pipeline run
    fn format_output(&self, output: &PipelineOutput) -> String;

    /// Format an extraction that was not dispatched
    fn format_extraction(&self, outcome: &ExtractionOutcome, fallback: Option<&str>) -> String;

    /// Format the tool registry
    fn format_tools(&self, registry: &ToolRegistry) -> String;
}
