//! Console output formatter for pipeline results

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use relay_domain::{
    ExtractionOutcome, ParsedAction, PipelineOutcome, PipelineOutput, ToolRegistry,
};
use serde::Serialize;
use serde_json::Value;

/// Formats pipeline results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format a finished pipeline run
    pub fn format_output(output: &PipelineOutput) -> String {
        let mut text = String::new();

        text.push_str(&Self::outcome_line(&output.outcome));
        text.push('\n');

        if let Some(action) = &output.action {
            text.push_str(&Self::action_block(action));
        }
        if output.attempts > 1 {
            text.push_str(&format!(
                "{} {} (retried after cleanup)\n",
                "Attempts:".cyan().bold(),
                output.attempts
            ));
        }

        match &output.outcome {
            PipelineOutcome::Success { body, .. } => {
                text.push_str(&Self::section_header("Result"));
                text.push_str(&Self::body_text(body));
                text.push('\n');
            }
            PipelineOutcome::BackendError(failure) => {
                text.push_str(&Self::section_header("Backend error"));
                text.push_str(&format!(
                    "{} {} ({})\n",
                    failure.status_code.to_string().red().bold(),
                    failure.code.as_deref().unwrap_or("-"),
                    failure.kind
                ));
                text.push_str(&failure.detail);
                text.push('\n');
            }
            PipelineOutcome::DispatchError(failure) => {
                text.push_str(&Self::section_header("Dispatch error"));
                if let Some(url) = &failure.url {
                    text.push_str(&format!("{} {}\n", "URL:".bold(), url));
                }
                text.push_str(&failure.detail);
                text.push('\n');
            }
            PipelineOutcome::ParseFailure { reason }
            | PipelineOutcome::NoExecutableAction { reason } => {
                text.push_str(reason);
                text.push('\n');
            }
            PipelineOutcome::UnknownFormat { raw } => {
                text.push_str(&Self::indent(raw, "  "));
                text.push('\n');
            }
        }

        if let Some(fallback) = &output.fallback {
            text.push_str(&Self::fallback_block(fallback));
        }

        text
    }

    /// Format an extraction that was not dispatched
    pub fn format_extraction(outcome: &ExtractionOutcome, fallback: Option<&str>) -> String {
        let mut text = String::new();
        match outcome {
            ExtractionOutcome::Action(action) => {
                text.push_str(&format!("{}\n", "Action extracted".green().bold()));
                text.push_str(&Self::action_block(action));
            }
            ExtractionOutcome::NoExecutableAction { reason } => {
                text.push_str(&format!("{}\n{}\n", "No executable action".yellow().bold(), reason));
            }
            ExtractionOutcome::ParseFailure { reason } => {
                text.push_str(&format!("{}\n{}\n", "Parse failure".red().bold(), reason));
            }
            ExtractionOutcome::UnknownFormat { raw } => {
                text.push_str(&format!(
                    "{}\n{}\n",
                    "Unknown format".red().bold(),
                    Self::indent(raw, "  ")
                ));
            }
        }
        if let Some(fallback) = fallback {
            text.push_str(&Self::fallback_block(fallback));
        }
        text
    }

    /// Format the tool registry as a table
    pub fn format_tools(registry: &ToolRegistry) -> String {
        let mut text = String::new();
        for spec in registry.all() {
            text.push_str(&format!("{} {}\n", spec.name.cyan().bold(), spec.url()));
            text.push_str(&format!("  {}\n", spec.purpose));
            let params: Vec<String> = spec
                .parameters
                .iter()
                .map(|p| match &p.default {
                    Some(default) => format!("{}={}", p.name, default),
                    None if p.required => p.name.clone(),
                    None => format!("{}?", p.name),
                })
                .collect();
            text.push_str(&format!("  {} {}\n", "params:".dimmed(), params.join(", ")));
            let aliases = registry.aliases_of(&spec.name);
            if !aliases.is_empty() {
                text.push_str(&format!("  {} {}\n", "aliases:".dimmed(), aliases.join(", ")));
            }
        }
        text
    }

    /// Format as JSON
    pub fn format_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    fn outcome_line(outcome: &PipelineOutcome) -> String {
        let label = outcome.kind_str().replace('_', " ");
        match outcome {
            PipelineOutcome::Success { tool, status_code, .. } => format!(
                "{} {} {}",
                label.to_uppercase().green().bold(),
                tool.bold(),
                format!("({})", status_code).dimmed()
            ),
            PipelineOutcome::NoExecutableAction { .. } => label.to_uppercase().yellow().bold().to_string(),
            _ => label.to_uppercase().red().bold().to_string(),
        }
    }

    fn action_block(action: &ParsedAction) -> String {
        let mut text = format!("{} {}\n", "Tool:".cyan().bold(), action.tool);
        for (key, value) in &action.payload {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            text.push_str(&format!("  {} {}\n", format!("{}:", key).dimmed(), rendered));
        }
        text
    }

    /// `output` strings print as-is, everything else as pretty JSON.
    fn body_text(body: &Value) -> String {
        match body.get("output") {
            Some(Value::String(s)) if body.get("results").is_none() => s.clone(),
            _ => Self::format_json(body),
        }
    }

    fn fallback_block(fallback: &str) -> String {
        format!(
            "{}{}\n",
            Self::section_header("Fallback steps (not executed)"),
            fallback.dimmed()
        )
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_output(&self, output: &PipelineOutput) -> String {
        Self::format_output(output)
    }

    fn format_extraction(&self, outcome: &ExtractionOutcome, fallback: Option<&str>) -> String {
        Self::format_extraction(outcome, fallback)
    }

    fn format_tools(&self, registry: &ToolRegistry) -> String {
        Self::format_tools(registry)
    }
}
