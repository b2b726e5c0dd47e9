//! Execution value objects: the single result shape of a dispatch.
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | [`ExecutionResult::Success`] | Backend answered 2xx; body passed through unmodified |
//! | [`ExecutionResult::BackendError`] | Backend answered with a classified rejection |
//! | [`ExecutionResult::DispatchError`] | The request never got an answer (unknown tool, unreachable, timeout) |

use super::codes::is_policy_code;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a backend rejection, derived from status and code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    /// Malformed request (400/404/405/413/422)
    ClientError,
    /// Refused by the backend's safety policy (403, or a policy code)
    PolicyViolation,
    /// The backend gave up waiting (408/504)
    Timeout,
    /// 429
    RateLimited,
    /// 503
    Unavailable,
    /// Other 5xx
    ServerError,
    Other,
}

impl BackendErrorKind {
    pub fn classify(status: u16, code: Option<&str>) -> Self {
        if status == 403 || code.is_some_and(is_policy_code) {
            return Self::PolicyViolation;
        }
        match status {
            400 | 404 | 405 | 413 | 422 => Self::ClientError,
            408 | 504 => Self::Timeout,
            429 => Self::RateLimited,
            503 => Self::Unavailable,
            500..=599 => Self::ServerError,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientError => "client_error",
            Self::PolicyViolation => "policy_violation",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Unavailable => "unavailable",
            Self::ServerError => "server_error",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a request never reached (or never came back from) a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchErrorKind {
    ToolNotFound,
    Unreachable,
    DnsFailure,
    Timeout,
    InvalidResponse,
    Other,
}

impl DispatchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToolNotFound => "tool_not_found",
            Self::Unreachable => "unreachable",
            Self::DnsFailure => "dns_failure",
            Self::Timeout => "timeout",
            Self::InvalidResponse => "invalid_response",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for DispatchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured rejection from a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendFailure {
    pub tool: String,
    pub status_code: u16,
    pub kind: BackendErrorKind,
    /// Backend error code (e.g., "read_only_violation"), when the body had one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub detail: String,
    /// The raw response body
    pub body: Value,
}

impl BackendFailure {
    /// Build from a non-2xx response, reading `code`/`detail` from the body.
    pub fn from_response(tool: impl Into<String>, status_code: u16, body: Value) -> Self {
        let code = body
            .get("code")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let detail = body
            .get("detail")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .or_else(|| body.as_str().map(|s| s.to_string()))
            .unwrap_or_else(|| body.to_string());
        Self {
            tool: tool.into(),
            status_code,
            kind: BackendErrorKind::classify(status_code, code.as_deref()),
            code,
            detail,
            body,
        }
    }
}

/// A request that got no usable answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchFailure {
    pub kind: DispatchErrorKind,
    /// The URL that was attempted, if resolution got that far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub detail: String,
}

impl DispatchFailure {
    pub fn new(kind: DispatchErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            url: None,
            detail: detail.into(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Outcome of dispatching one action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ExecutionResult {
    Success {
        tool: String,
        status_code: u16,
        body: Value,
    },
    BackendError(BackendFailure),
    DispatchError(DispatchFailure),
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Success { body, .. } => Some(body),
            Self::BackendError(failure) => Some(&failure.body),
            Self::DispatchError(_) => None,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::BackendError(_) => "backend_error",
            Self::DispatchError(_) => "dispatch_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_by_status() {
        assert_eq!(BackendErrorKind::classify(400, None), BackendErrorKind::ClientError);
        assert_eq!(BackendErrorKind::classify(422, None), BackendErrorKind::ClientError);
        assert_eq!(BackendErrorKind::classify(403, None), BackendErrorKind::PolicyViolation);
        assert_eq!(BackendErrorKind::classify(408, None), BackendErrorKind::Timeout);
        assert_eq!(BackendErrorKind::classify(429, None), BackendErrorKind::RateLimited);
        assert_eq!(BackendErrorKind::classify(503, None), BackendErrorKind::Unavailable);
        assert_eq!(BackendErrorKind::classify(502, None), BackendErrorKind::ServerError);
        assert_eq!(BackendErrorKind::classify(302, None), BackendErrorKind::Other);
    }

    #[test]
    fn test_policy_code_overrides_client_status() {
        assert_eq!(
            BackendErrorKind::classify(400, Some("read_only_violation")),
            BackendErrorKind::PolicyViolation
        );
        assert_eq!(
            BackendErrorKind::classify(400, Some("sql_error")),
            BackendErrorKind::ClientError
        );
    }

    #[test]
    fn test_backend_failure_from_structured_body() {
        let failure = BackendFailure::from_response(
            "sql",
            400,
            json!({"status": "error", "code": "sql_error", "detail": "near \";\": syntax error"}),
        );
        assert_eq!(failure.kind, BackendErrorKind::ClientError);
        assert_eq!(failure.code.as_deref(), Some("sql_error"));
        assert!(failure.detail.contains("syntax error"));
    }

    #[test]
    fn test_backend_failure_from_plain_body() {
        let failure = BackendFailure::from_response("fetch", 503, json!("service warming up"));
        assert_eq!(failure.kind, BackendErrorKind::Unavailable);
        assert!(failure.code.is_none());
        assert_eq!(failure.detail, "service warming up");
    }

    #[test]
    fn test_execution_result_serialization_tag() {
        let result = ExecutionResult::DispatchError(
            DispatchFailure::new(DispatchErrorKind::Timeout, "timed out")
                .with_url("http://localhost:8001/execute_shell"),
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["result"], "dispatch_error");
        assert_eq!(value["kind"], "timeout");
        assert!(!result.is_success());
        assert!(result.body().is_none());
    }
}
