//! Tool domain entities

use serde::{Deserialize, Serialize};

/// The capability a tool exposes.
///
/// Every registered tool has exactly one kind. The kind decides which
/// fence labels select the tool during extraction and which cleanup
/// rules apply to the extracted body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Command execution (argv, no shell string)
    Shell,
    /// Read-only relational query
    Sql,
    /// Restricted code evaluation
    Eval,
    /// Outbound URL fetch
    Fetch,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::Shell,
        ToolKind::Sql,
        ToolKind::Eval,
        ToolKind::Fetch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Shell => "shell",
            ToolKind::Sql => "sql",
            ToolKind::Eval => "eval",
            ToolKind::Fetch => "fetch",
        }
    }

    /// Parse a logical tool name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "shell" => Some(ToolKind::Shell),
            "sql" => Some(ToolKind::Sql),
            "eval" => Some(ToolKind::Eval),
            "fetch" => Some(ToolKind::Fetch),
            _ => None,
        }
    }

    /// Language labels on a fenced block that imply this tool.
    pub fn fence_labels(&self) -> &'static [&'static str] {
        match self {
            ToolKind::Shell => &["bash", "sh", "shell", "zsh", "console", "terminal"],
            ToolKind::Sql => &["sql", "sqlite", "postgresql", "mysql"],
            ToolKind::Eval => &["lua", "python", "py"],
            ToolKind::Fetch => &["url", "http"],
        }
    }

    /// Alternate names models commonly use for this tool.
    ///
    /// Ordinary English words are left out: an alias also selects a tool
    /// when it opens an unfenced action line.
    pub fn default_aliases(&self) -> &'static [&'static str] {
        match self {
            ToolKind::Shell => &["shell_command", "bash", "sh"],
            ToolKind::Sql => &["system_sqlite", "sqlite"],
            ToolKind::Eval => &["python_eval", "python", "lua"],
            ToolKind::Fetch => &["fetch_web", "web_fetch"],
        }
    }

    /// Whether a trailing statement terminator is stripped from the body.
    pub fn strips_terminator(&self) -> bool {
        matches!(self, ToolKind::Sql)
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameter specification for a tool request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name (the JSON field sent to the backend)
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Whether this parameter is required
    pub required: bool,
    /// Parameter type hint ("string", "object", "number")
    pub param_type: String,
    /// Value used when the extractor has nothing better
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: "string".to_string(),
            default: None,
        }
    }

    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }

    pub fn with_default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// One entry of the tool registry: where a tool lives and what it accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique logical name (e.g., "sql")
    pub name: String,
    /// Capability kind
    pub kind: ToolKind,
    /// Base address of the backend (e.g., "http://localhost:8002")
    pub address: String,
    /// Endpoint path on the backend (e.g., "/execute_query")
    pub endpoint: String,
    /// Human-readable purpose
    pub purpose: String,
    /// Declared request schema
    pub parameters: Vec<ToolParameter>,
    /// The parameter that receives the extracted command text
    pub body_field: String,
}

impl ToolSpec {
    pub fn new(
        kind: ToolKind,
        address: impl Into<String>,
        endpoint: impl Into<String>,
        purpose: impl Into<String>,
    ) -> Self {
        Self {
            name: kind.as_str().to_string(),
            kind,
            address: address.into(),
            endpoint: endpoint.into(),
            purpose: purpose.into(),
            parameters: Vec::new(),
            body_field: String::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_body_field(mut self, field: impl Into<String>) -> Self {
        self.body_field = field.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = purpose.into();
        self
    }

    /// Full backend URL: address joined with endpoint, exactly one slash between.
    pub fn url(&self) -> String {
        let base = self.address.trim_end_matches('/');
        let path = self.endpoint.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Replace the default of a declared parameter. Unknown names are ignored.
    pub fn with_parameter_default(
        mut self,
        name: &str,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        if let Some(param) = self.parameters.iter_mut().find(|p| p.name == name) {
            param.default = Some(value.into());
        }
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Parameters that carry a default value, in declaration order
    pub fn defaults(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.parameters
            .iter()
            .filter_map(|p| p.default.as_ref().map(|v| (p.name.as_str(), v)))
    }
}
