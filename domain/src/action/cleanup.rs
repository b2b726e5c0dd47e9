//! Text cleanup applied to an extracted command body.
//!
//! Two passes exist. The first runs during extraction, before anything is
//! sent. The second ([`secondary_cleanup`]) is harsher and only runs when a
//! backend rejected the first attempt as malformed; see
//! [`crate::execution::retry`].

use super::entities::ParsedAction;
use crate::tool::entities::{ToolKind, ToolSpec};
use serde_json::Value;

/// Strip a single trailing `;` (and the whitespace around it).
pub fn strip_statement_terminator(body: &str) -> &str {
    let trimmed = body.trim_end();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end()
}

/// Remove a pair of inline backticks wrapping the whole body.
pub fn strip_inline_backticks(body: &str) -> &str {
    let trimmed = body.trim();
    if trimmed.len() >= 2
        && trimmed.starts_with('`')
        && trimmed.ends_with('`')
        && !trimmed.starts_with("```")
    {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// Drop fence delimiter lines (```` ``` ```` with or without a label).
pub fn strip_fence_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Second-chance cleanup of a body string.
///
/// Removes stray backticks anywhere and trailing whitespace; for
/// terminator-bearing tools every trailing `;` is removed, not just one.
pub fn clean_body_secondary(body: &str, kind: ToolKind) -> String {
    let mut cleaned = body.replace('`', "");
    if kind.strips_terminator() {
        loop {
            let trimmed = cleaned.trim_end();
            match trimmed.strip_suffix(';') {
                Some(rest) => cleaned = rest.to_string(),
                None => break,
            }
        }
    }
    cleaned.trim().to_string()
}

/// Apply [`clean_body_secondary`] to the action's body field.
///
/// Returns `None` when nothing changes: a retry with an identical payload
/// would only repeat the rejection.
pub fn secondary_cleanup(action: &ParsedAction, spec: &ToolSpec) -> Option<ParsedAction> {
    let body = action.get_string(&spec.body_field)?;
    let cleaned = clean_body_secondary(body, spec.kind);
    if cleaned == body || cleaned.is_empty() {
        return None;
    }
    let mut retried = action.clone();
    retried
        .payload
        .insert(spec.body_field.clone(), Value::String(cleaned));
    Some(retried)
}
