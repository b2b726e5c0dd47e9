//! Configuration issues detected while building the runtime configuration.
//!
//! Loading never fails on a questionable value; instead the loader collects
//! [`ConfigIssue`]s and the binary decides whether to abort (any
//! [`Severity::Error`]) or only warn.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A `[tools.<name>]` section names a tool that does not exist.
    UnknownTool { name: String },
    /// A tool address is not an http(s) base URL.
    InvalidAddress { tool: String, address: String },
    /// A timeout was configured as zero.
    ZeroTimeout { field: String },
    /// The default database is not one of the configured databases.
    UnknownDefaultDatabase { name: String },
    /// A bind address could not be parsed as `host:port`.
    InvalidBindAddress { backend: String, value: String },
    /// An alias points at a name that is already a different tool.
    ConflictingAlias { alias: String },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
