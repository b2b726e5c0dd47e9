//! Built-in tool table.
//!
//! These are the four capabilities the relay knows how to route. Addresses
//! are defaults only; configuration may point a tool at another host, but it
//! cannot add a kind that is not listed here.
//!
//! | Tool | Default address | Endpoint | Body field |
//! |------|-----------------|----------|------------|
//! | `shell` | `http://localhost:8001` | `/execute_shell` | `command` |
//! | `sql` | `http://localhost:8002` | `/execute_query` | `query` |
//! | `eval` | `http://localhost:8003` | `/execute_code` | `code` |
//! | `fetch` | `http://localhost:8004` | `/fetch_url` | `url` |

use super::entities::{ToolKind, ToolParameter, ToolSpec};

/// Database used when a query names none.
pub const DEFAULT_DB_NAME: &str = "system";

pub const SHELL_ENDPOINT: &str = "/execute_shell";
pub const SQL_ENDPOINT: &str = "/execute_query";
pub const EVAL_ENDPOINT: &str = "/execute_code";
pub const FETCH_ENDPOINT: &str = "/fetch_url";

/// Default port for each backend
pub fn default_port(kind: ToolKind) -> u16 {
    match kind {
        ToolKind::Shell => 8001,
        ToolKind::Sql => 8002,
        ToolKind::Eval => 8003,
        ToolKind::Fetch => 8004,
    }
}

pub fn default_endpoint(kind: ToolKind) -> &'static str {
    match kind {
        ToolKind::Shell => SHELL_ENDPOINT,
        ToolKind::Sql => SQL_ENDPOINT,
        ToolKind::Eval => EVAL_ENDPOINT,
        ToolKind::Fetch => FETCH_ENDPOINT,
    }
}

pub fn default_address(kind: ToolKind) -> String {
    format!("http://localhost:{}", default_port(kind))
}

/// Built-in spec for a tool kind
pub fn builtin_spec(kind: ToolKind) -> ToolSpec {
    let address = default_address(kind);
    let endpoint = default_endpoint(kind);
    match kind {
        ToolKind::Shell => ToolSpec::new(
            kind,
            address,
            endpoint,
            "Run a single command line (argument vector, no shell) with a hard timeout.",
        )
        .with_parameter(ToolParameter::new("command", "The command line to execute", true))
        .with_body_field("command"),
        ToolKind::Sql => ToolSpec::new(
            kind,
            address,
            endpoint,
            "Run a read-only SELECT against one of the configured databases.",
        )
        .with_parameter(ToolParameter::new("query", "A single SELECT statement", true))
        .with_parameter(
            ToolParameter::new("db_name", "Configured database identifier", true)
                .with_default(DEFAULT_DB_NAME),
        )
        .with_body_field("query"),
        ToolKind::Eval => ToolSpec::new(
            kind,
            address,
            endpoint,
            "Evaluate a short Lua snippet in a sandbox (math, string and table only); assign the answer to `result`.",
        )
        .with_parameter(ToolParameter::new("code", "Code to evaluate", true))
        .with_body_field("code"),
        ToolKind::Fetch => ToolSpec::new(
            kind,
            address,
            endpoint,
            "Fetch a public URL and return a size-bounded body.",
        )
        .with_parameter(ToolParameter::new("url", "Target URL (http or https)", true))
        .with_parameter(
            ToolParameter::new("params", "Query parameters", false).with_type("object"),
        )
        .with_parameter(
            ToolParameter::new("timeout", "Timeout in seconds", false).with_type("number"),
        )
        .with_body_field("url"),
    }
}
