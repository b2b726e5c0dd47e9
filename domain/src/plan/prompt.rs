//! System prompt describing the plan contract to the plan generator.

use super::parser::{FALLBACK_MARKER, PRIMARY_ACTION_MARKER};
use crate::tool::ToolRegistry;

/// Build the system prompt for a registry.
///
/// Lists every tool with its aliases and fence label, then the exact
/// section layout the extractor expects.
pub fn system_prompt(registry: &ToolRegistry) -> String {
    let mut prompt = String::from(
        "You are an execution planner. You never act on the host directly; \
         you propose exactly one action for one of the tools below.\n\n## Tools\n",
    );

    for spec in registry.all() {
        let aliases = registry.aliases_of(&spec.name);
        let label = spec.kind.fence_labels().first().copied().unwrap_or("text");
        prompt.push_str(&format!("- {} (```{}): {}", spec.name, label, spec.purpose));
        if !aliases.is_empty() {
            prompt.push_str(&format!(" [aliases: {}]", aliases.join(", ")));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "\n## Response format\n\
         ### {primary} (Executable):\n\
         One fenced code block whose language label names the tool, containing \
         only the command. Write \"None\" and a short rationale if no action is needed.\n\n\
         ### {fallback} (Hierarchy):\n\
         Numbered manual steps to try if the action fails. These are never executed.\n",
        primary = PRIMARY_ACTION_MARKER,
        fallback = FALLBACK_MARKER,
    ));
    prompt
}
