//! Action extraction: primary-action text → one [`ExtractionOutcome`].
//!
//! The model's output is free text, so extraction is a sequence of
//! heuristics with a fixed precedence:
//!
//! 1. a fenced block whose language label maps to a tool
//! 2. a tool named on an unfenced line: a header line (`**SYSTEM_SQLITE**`),
//!    a `TOOL:` prefix, or the first word of the line
//! 3. prose detection, only when no tool was named (the model chose not to act)
//!
//! An unfenced command is one line: the rest of the `TOOL:` line, or the
//! next non-blank line (or unlabelled fenced block) after a header. Lines
//! below it are commentary and never reach the backend.
//!
//! Whatever selected the tool, the body then goes through the same cleanup
//! (decorative headers, `TOOL:` prefixes, inline backticks, and for queries
//! a single trailing `;`) and is placed into the tool's declared body field.
//! Nothing here guesses a default tool.

use super::cleanup::{strip_fence_lines, strip_inline_backticks, strip_statement_terminator};
use super::entities::{ExtractionOutcome, ParsedAction};
use crate::plan::{Plan, split_plan};
use crate::tool::{
    entities::{ToolKind, ToolSpec},
    registry::ToolRegistry,
    traits::{DefaultToolValidator, ToolValidator},
};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Lowercase phrases that mark a primary-action body as reasoning, not a command.
pub const HEDGE_PHRASES: &[&str] = &[
    "rationale",
    "no action",
    "no executable",
    "not recommended",
    "not necessary",
    "n/a",
];

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+-]*)[^\n]*\n(.*?)(?:```|\z)").expect("valid fence regex")
});

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid word regex"));

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s`'"<>)]+"#).expect("valid url regex"));

/// Characters that decorate a header line around a tool name.
const DECORATION: &[char] = &['#', '*', '_', '`', '-', '>', ':', '[', ']'];

/// Extracts a single action from plan text using a tool registry.
pub struct ActionExtractor<'a> {
    registry: &'a ToolRegistry,
    validator: DefaultToolValidator,
}

impl<'a> ActionExtractor<'a> {
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Self {
            registry,
            validator: DefaultToolValidator,
        }
    }

    /// Split raw plan text and extract its primary action.
    pub fn extract(&self, plan_text: &str) -> ExtractionOutcome {
        self.extract_with_fallback(plan_text).0
    }

    /// Like [`extract`](Self::extract), also returning the fallback section.
    pub fn extract_with_fallback(&self, plan_text: &str) -> (ExtractionOutcome, Option<String>) {
        match split_plan(plan_text) {
            Some(plan) => (self.extract_plan(&plan), plan.fallback),
            None => (
                ExtractionOutcome::parse_failure("no primary action block"),
                None,
            ),
        }
    }

    pub fn extract_plan(&self, plan: &Plan) -> ExtractionOutcome {
        self.extract_section(&plan.primary_action)
    }

    /// Extract from the body of a primary-action section.
    pub fn extract_section(&self, section: &str) -> ExtractionOutcome {
        if section.trim().is_empty() {
            return ExtractionOutcome::no_action("primary action block is empty");
        }

        if let Some((spec, content)) = self.match_fence(section) {
            let body = self.clean_body(content, spec.kind);
            return self.build(spec, body, section);
        }

        match self.match_bare_token(section) {
            Some((spec, raw)) => {
                let body = self.clean_body(&raw, spec.kind);
                if reads_as_no_op(&body) {
                    return ExtractionOutcome::no_action("model recommended no executable action");
                }
                self.build(spec, body, section)
            }
            None if looks_like_prose(&strip_fence_lines(section)) => {
                ExtractionOutcome::no_action("model recommended no executable action")
            }
            None => ExtractionOutcome::unknown_format(section.trim()),
        }
    }

    /// First fenced block, if its label maps to a tool.
    fn match_fence<'s>(&self, section: &'s str) -> Option<(&'a ToolSpec, &'s str)> {
        let captures = FENCE_RE.captures(section)?;
        let label = captures.get(1).map(|m| m.as_str()).unwrap_or("");
        if label.is_empty() {
            return None;
        }
        let spec = self.registry.resolve_fence_label(label)?;
        let content = captures.get(2).map(|m| m.as_str()).unwrap_or("");
        Some((spec, content))
    }

    /// First unfenced line naming a tool, with the command that belongs to it.
    fn match_bare_token(&self, section: &str) -> Option<(&'a ToolSpec, String)> {
        let lines: Vec<&str> = section.lines().collect();
        for (index, line) in lines.iter().enumerate() {
            if line.trim_start().starts_with("```") {
                continue;
            }
            let Some((spec, rest, header)) = self.tool_on_line(line) else {
                continue;
            };
            let body = if header || rest.trim().is_empty() {
                next_block(&lines[index + 1..])
            } else {
                rest.to_string()
            };
            return Some((spec, body));
        }
        None
    }

    /// A tool named on one line.
    ///
    /// Accepted: the whole line is a tool name plus decoration (a header),
    /// a tool name followed by `:`, or a tool name opening the line.
    /// Returns the spec, the text after the name, and whether it was a header.
    fn tool_on_line<'l>(&self, line: &'l str) -> Option<(&'a ToolSpec, &'l str, bool)> {
        if self.is_header_line(line) {
            let name = line.trim_matches(|c: char| c.is_whitespace() || DECORATION.contains(&c));
            return self.registry.resolve(name).ok().map(|spec| (spec, "", true));
        }
        for word in WORD_RE.find_iter(line) {
            let after = line[word.end()..].trim_start_matches(['*', '_', '`', ' ', '\t']);
            let opens_line = line[..word.start()]
                .chars()
                .all(|c| c.is_whitespace() || DECORATION.contains(&c));
            let rest = match after.strip_prefix(':') {
                Some(rest) => rest,
                None if opens_line => after,
                None => continue,
            };
            if let Ok(spec) = self.registry.resolve(word.as_str()) {
                return Some((spec, rest, false));
            }
        }
        None
    }

    /// A line consisting only of a tool name or alias plus decoration.
    fn is_header_line(&self, line: &str) -> bool {
        let stripped = line.trim().trim_matches(|c: char| c.is_whitespace() || DECORATION.contains(&c));
        !stripped.is_empty() && self.registry.resolve_name(stripped).is_some()
    }

    /// Remove header lines and a leading `TOOL:` prefix, then trim.
    fn clean_body(&self, body: &str, kind: ToolKind) -> String {
        let kept: Vec<&str> = body
            .lines()
            .filter(|line| !line.trim_start().starts_with("```"))
            .filter(|line| !self.is_header_line(line))
            .collect();
        let mut text = kept.join("\n").trim().to_string();

        if let Some(stripped) = self.strip_tool_prefix(&text) {
            text = stripped;
        }

        let mut cleaned = strip_inline_backticks(&text).to_string();
        if kind.strips_terminator() {
            cleaned = strip_statement_terminator(&cleaned).to_string();
        }
        cleaned.trim().to_string()
    }

    fn strip_tool_prefix(&self, text: &str) -> Option<String> {
        let candidate = text.trim_start_matches(['#', '*', '_', '`', ' ']);
        let word = WORD_RE.find(candidate).filter(|m| m.start() == 0)?;
        self.registry.resolve_name(word.as_str())?;
        let rest = candidate[word.end()..].trim_start_matches(['*', '_', '`', ' ', '\t']);
        rest.strip_prefix(':').map(|r| r.trim().to_string())
    }

    fn build(&self, spec: &ToolSpec, mut body: String, section: &str) -> ExtractionOutcome {
        if body.is_empty() {
            return ExtractionOutcome::no_action("primary action block has no command");
        }

        if spec.kind == ToolKind::Fetch {
            match URL_RE.find(&body) {
                Some(url) => body = url.as_str().to_string(),
                None => return ExtractionOutcome::unknown_format(section.trim()),
            }
        }

        let mut payload = Map::new();
        payload.insert(spec.body_field.clone(), Value::String(body));
        for (name, default) in spec.defaults() {
            payload
                .entry(name.to_string())
                .or_insert_with(|| default.clone());
        }

        if let Err(reason) = self.validator.validate(&payload, spec) {
            return ExtractionOutcome::parse_failure(reason);
        }

        ExtractionOutcome::Action(ParsedAction {
            tool: spec.name.clone(),
            payload,
        })
    }
}

/// Whether unfenced text reads as reasoning rather than a command.
pub fn looks_like_prose(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    let bare = lower.trim_end_matches('.');
    bare == "none" || HEDGE_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// A command slot the model filled with a no-op marker (`None`, `N/A`, ...).
///
/// Stricter than [`looks_like_prose`]: `SELECT rationale FROM notes` is a query.
fn reads_as_no_op(body: &str) -> bool {
    let lower = body.trim().to_lowercase();
    let bare = lower.trim_end_matches('.');
    bare == "none" || HEDGE_PHRASES.iter().any(|phrase| lower.starts_with(phrase))
}

/// The command after a header: the next non-blank line, or the whole
/// fenced block when one opens there.
fn next_block(lines: &[&str]) -> String {
    let mut rest = lines.iter().skip_while(|line| line.trim().is_empty());
    let Some(first) = rest.next() else {
        return String::new();
    };
    if !first.trim_start().starts_with("```") {
        return first.to_string();
    }
    rest.take_while(|line| !line.trim_start().starts_with("```"))
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(text: &str) -> ExtractionOutcome {
        let registry = ToolRegistry::canonical();
        ActionExtractor::new(&registry).extract(text)
    }

    #[test]
    fn test_fenced_sql_block() {
        let text = "### PRIMARY ACTION (Executable):\n```sql\nSELECT path FROM file_metadata;\n```\n### FALLBACK STEPS (Hierarchy):\n1. Check the indexer";
        let action = extract(text).into_action().expect("action");
        assert_eq!(action.tool, "sql");
        assert_eq!(
            action.payload_value(),
            json!({"query": "SELECT path FROM file_metadata", "db_name": "system"})
        );
    }

    #[test]
    fn test_fenced_shell_block_exact_command() {
        let text = "### PRIMARY ACTION:\n```bash\n   docker ps -a --filter name=sqlite   \n```";
        let action = extract(text).into_action().expect("action");
        assert_eq!(action.tool, "shell");
        assert_eq!(action.get_string("command"), Some("docker ps -a --filter name=sqlite"));
    }

    #[test]
    fn test_shell_trailing_semicolon_kept() {
        let text = "### PRIMARY ACTION:\n```sh\necho done;\n```";
        let action = extract(text).into_action().unwrap();
        assert_eq!(action.get_string("command"), Some("echo done;"));
    }

    #[test]
    fn test_only_one_terminator_stripped_on_first_pass() {
        let text = "### PRIMARY ACTION:\n```sql\nSELECT 1;;\n```";
        let action = extract(text).into_action().unwrap();
        assert_eq!(action.get_string("query"), Some("SELECT 1;"));
    }

    #[test]
    fn test_fence_with_tool_header_inside() {
        let text = "### PRIMARY ACTION:\n```sql\nSYSTEM_SQLITE: SELECT name FROM files;\n```";
        let action = extract(text).into_action().unwrap();
        assert_eq!(action.get_string("query"), Some("SELECT name FROM files"));
    }

    #[test]
    fn test_bare_tool_name_with_colon_prefix() {
        let action = extract("### PRIMARY ACTION:\nSHELL_COMMAND: netstat -tlnp")
            .into_action()
            .unwrap();
        assert_eq!(action.tool, "shell");
        assert_eq!(action.get_string("command"), Some("netstat -tlnp"));
    }

    #[test]
    fn test_commentary_below_unfenced_command_is_dropped() {
        let text = "### PRIMARY ACTION (Executable):\nSHELL_COMMAND: ls -la\nThis lists hidden files too.";
        let action = extract(text).into_action().expect("action");
        assert_eq!(action.tool, "shell");
        assert_eq!(action.get_string("command"), Some("ls -la"));
    }

    #[test]
    fn test_rationale_below_unfenced_command_keeps_the_command() {
        let text = "### PRIMARY ACTION (Executable):\nSHELL_COMMAND: docker ps -a\nRationale: check whether the container is running.";
        let action = extract(text).into_action().expect("action");
        assert_eq!(action.get_string("command"), Some("docker ps -a"));
    }

    #[test]
    fn test_header_then_command_on_next_line() {
        let text = "### PRIMARY ACTION:\nSHELL_COMMAND:\n\n  uptime\nShows load averages.";
        let action = extract(text).into_action().expect("action");
        assert_eq!(action.get_string("command"), Some("uptime"));
    }

    #[test]
    fn test_tool_word_inside_prose_is_not_a_tool() {
        let text = "### PRIMARY ACTION (Executable):\nRun a query against the database to list files.";
        assert_eq!(
            extract(text),
            ExtractionOutcome::unknown_format("Run a query against the database to list files.")
        );
        let text = "### PRIMARY ACTION:\nCheck the logs with bash or sh first.";
        assert!(matches!(extract(text), ExtractionOutcome::UnknownFormat { .. }));
    }

    #[test]
    fn test_tool_with_no_op_marker_is_no_executable_action() {
        assert!(matches!(
            extract("### PRIMARY ACTION:\nSHELL_COMMAND: N/A"),
            ExtractionOutcome::NoExecutableAction { .. }
        ));
        let action = extract("### PRIMARY ACTION:\nSYSTEM_SQLITE: SELECT rationale FROM notes;")
            .into_action()
            .expect("action");
        assert_eq!(action.get_string("query"), Some("SELECT rationale FROM notes"));
    }

    #[test]
    fn test_extract_with_fallback_returns_both_sections() {
        let registry = ToolRegistry::canonical();
        let extractor = ActionExtractor::new(&registry);
        let (outcome, fallback) = extractor.extract_with_fallback(
            "### PRIMARY ACTION:\n```sql\nSELECT 1\n```\n### FALLBACK STEPS:\n1. Retry later",
        );
        assert!(matches!(outcome, ExtractionOutcome::Action(_)));
        assert_eq!(fallback.as_deref().map(str::trim), Some("1. Retry later"));

        let (outcome, fallback) = extractor.extract_with_fallback("just chatting");
        assert_eq!(outcome, ExtractionOutcome::parse_failure("no primary action block"));
        assert!(fallback.is_none());
    }

    #[test]
    fn test_decorative_header_line_removed() {
        let text = "### PRIMARY ACTION:\n**SYSTEM_SQLITE**\n`SELECT count(*) FROM files;`";
        let action = extract(text).into_action().unwrap();
        assert_eq!(action.tool, "sql");
        assert_eq!(action.get_string("query"), Some("SELECT count(*) FROM files"));
    }

    #[test]
    fn test_unlabelled_fence_falls_back_to_bare_token() {
        let text = "### PRIMARY ACTION:\nSHELL_COMMAND\n```\nls -la /var/log\n```";
        let action = extract(text).into_action().unwrap();
        assert_eq!(action.tool, "shell");
        assert_eq!(action.get_string("command"), Some("ls -la /var/log"));
    }

    #[test]
    fn test_fence_takes_precedence_over_bare_token() {
        let text = "### PRIMARY ACTION:\nUse the shell to check.\n```sql\nSELECT 1\n```";
        let action = extract(text).into_action().unwrap();
        assert_eq!(action.tool, "sql");
        assert_eq!(action.get_string("query"), Some("SELECT 1"));
    }

    #[test]
    fn test_no_marker_is_parse_failure() {
        assert_eq!(
            extract("```bash\nls\n```"),
            ExtractionOutcome::parse_failure("no primary action block")
        );
    }

    #[test]
    fn test_prose_is_no_executable_action() {
        let text = "### PRIMARY ACTION:\nRationale: the container is healthy, nothing to run.";
        assert!(matches!(
            extract(text),
            ExtractionOutcome::NoExecutableAction { .. }
        ));
        assert!(matches!(
            extract("### PRIMARY ACTION:\nNone."),
            ExtractionOutcome::NoExecutableAction { .. }
        ));
    }

    #[test]
    fn test_empty_section_is_no_executable_action() {
        let text = "### PRIMARY ACTION:\n\n### FALLBACK STEPS:\n1. wait";
        assert!(matches!(
            extract(text),
            ExtractionOutcome::NoExecutableAction { .. }
        ));
    }

    #[test]
    fn test_fence_with_only_header_is_no_executable_action() {
        let text = "### PRIMARY ACTION:\n```bash\nSHELL_COMMAND:\n```";
        assert!(matches!(
            extract(text),
            ExtractionOutcome::NoExecutableAction { .. }
        ));
    }

    #[test]
    fn test_unknown_tool_is_unknown_format_with_raw() {
        let text = "### PRIMARY ACTION:\n```json\n{\"op\": \"restart\"}\n```";
        assert_eq!(
            extract(text),
            ExtractionOutcome::unknown_format("```json\n{\"op\": \"restart\"}\n```")
        );
    }

    #[test]
    fn test_fetch_takes_first_url() {
        let text = "### PRIMARY ACTION:\nFETCH_WEB: get https://status.example.com/api?x=1 now";
        let action = extract(text).into_action().unwrap();
        assert_eq!(action.tool, "fetch");
        assert_eq!(
            action.payload_value(),
            json!({"url": "https://status.example.com/api?x=1"})
        );
    }

    #[test]
    fn test_eval_from_lua_fence() {
        let text = "### PRIMARY ACTION:\n```lua\nresult = 2 ^ 10\n```";
        let action = extract(text).into_action().unwrap();
        assert_eq!(action.tool, "eval");
        assert_eq!(action.get_string("code"), Some("result = 2 ^ 10"));
    }

    #[test]
    fn test_eval_from_python_fence() {
        let text = "### PRIMARY ACTION:\n```python\nresult = 6 * 7\n```";
        let action = extract(text).into_action().unwrap();
        assert_eq!(action.tool, "eval");
        assert_eq!(action.get_string("code"), Some("result = 6 * 7"));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let text = "### PRIMARY ACTION (Executable):\n```sql\nSELECT path FROM file_metadata;\n```";
        assert_eq!(extract(text), extract(text));
    }

    #[test]
    fn test_looks_like_prose() {
        assert!(looks_like_prose("No action is required."));
        assert!(looks_like_prose("none"));
        assert!(!looks_like_prose("SHELL_COMMAND: ls"));
    }
}
