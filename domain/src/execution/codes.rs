//! Error codes carried in backend error bodies.
//!
//! Every backend answers a rejection with
//! `{"status": "error", "code": <code>, "detail": <text>}`. The HTTP status
//! alone cannot tell a malformed request from a policy refusal (both can be
//! 400), so the dispatcher reads the code as well.

pub const INVALID_REQUEST: &str = "invalid_request";
pub const COMMAND_NOT_FOUND: &str = "command_not_found";
pub const TIMEOUT: &str = "timeout";
pub const READ_ONLY_VIOLATION: &str = "read_only_violation";
pub const UNKNOWN_DATABASE: &str = "unknown_database";
pub const DATABASE_UNAVAILABLE: &str = "database_unavailable";
pub const SQL_ERROR: &str = "sql_error";
pub const DENYLISTED_TOKEN: &str = "denylisted_token";
pub const EXECUTION_ERROR: &str = "execution_error";
pub const FORBIDDEN_TARGET: &str = "forbidden_target";
pub const NETWORK_ERROR: &str = "network_error";
pub const REMOTE_HTTP_ERROR: &str = "remote_http_error";
pub const INTERNAL: &str = "internal";

/// Codes that report a policy decision. Retrying cannot change them.
pub const POLICY_CODES: &[&str] = &[
    READ_ONLY_VIOLATION,
    UNKNOWN_DATABASE,
    DATABASE_UNAVAILABLE,
    DENYLISTED_TOKEN,
    FORBIDDEN_TARGET,
    COMMAND_NOT_FOUND,
];

pub fn is_policy_code(code: &str) -> bool {
    POLICY_CODES.contains(&code)
}
