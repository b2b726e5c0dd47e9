//! Splitting raw plan text into its sections.
//!
//! Section headers are matched by literal marker, case-insensitively, so
//! `### PRIMARY ACTION (Executable):`, `**Primary action:**` and
//! `PRIMARY ACTION: SHELL_COMMAND: ls` are all accepted. Text after the
//! header's colon on the same line belongs to the section body.

use super::entities::Plan;

/// Literal marker introducing the primary-action section
pub const PRIMARY_ACTION_MARKER: &str = "PRIMARY ACTION";

/// Literal marker introducing the fallback section
pub const FALLBACK_MARKER: &str = "FALLBACK STEPS";

/// Split plan text into a [`Plan`].
///
/// Returns `None` when the text has no primary-action marker. A fallback
/// marker inside a fenced block does not end the primary section.
pub fn split_plan(text: &str) -> Option<Plan> {
    let mut lines = text.lines();

    let first_body = loop {
        let line = lines.next()?;
        if let Some(rest) = after_marker(line, PRIMARY_ACTION_MARKER) {
            break rest;
        }
    };

    let mut primary: Vec<&str> = Vec::new();
    if !first_body.is_empty() {
        primary.push(first_body);
    }

    let mut in_fence = false;
    let mut fallback: Option<Vec<&str>> = None;

    for line in lines.by_ref() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        if !in_fence && let Some(rest) = after_marker(line, FALLBACK_MARKER) {
            fallback = Some(if rest.is_empty() { Vec::new() } else { vec![rest] });
            break;
        }
        primary.push(line);
    }

    if let Some(collected) = fallback.as_mut() {
        collected.extend(lines);
    }

    let plan = Plan::new(primary.join("\n"));
    let fallback_text = fallback
        .map(|collected| collected.join("\n").trim().to_string())
        .filter(|text| !text.is_empty());

    Some(match fallback_text {
        Some(text) => plan.with_fallback(text),
        None => plan,
    })
}

/// If `line` is a header carrying `marker`, return the text after it.
///
/// The remainder skips a parenthesised qualifier (`(Executable)`), the
/// colon and markdown emphasis, e.g. `### PRIMARY ACTION (Executable): ls`
/// yields `ls`.
fn after_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let upper = line.to_ascii_uppercase();
    let start = upper.find(marker)?;

    // Only decoration may precede the marker on a header line.
    let prefix = &line[..start];
    if !prefix
        .chars()
        .all(|c| c.is_whitespace() || matches!(c, '#' | '*' | '_' | '-' | '>' | '[' | '0'..='9' | '.'))
    {
        return None;
    }

    let mut rest = line[start + marker.len()..].trim_start();
    if rest.starts_with('(')
        && let Some(close) = rest.find(')')
    {
        rest = rest[close + 1..].trim_start();
    }
    rest = rest.trim_start_matches(['*', '_', ']']).trim_start();
    rest = rest.strip_prefix(':').unwrap_or(rest);
    Some(rest.trim_start_matches(['*', '_']).trim())
}
