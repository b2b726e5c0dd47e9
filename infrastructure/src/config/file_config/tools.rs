//! Tool configuration from TOML (`[tools.<name>]` sections)
//!
//! Each section overrides one built-in tool. Sections can move a tool to
//! another host or add aliases; they cannot define new tool kinds.
//!
//! ```toml
//! [tools.sql]
//! address = "http://db-host:8002"
//! aliases = ["SYSTEM_DB"]
//!
//! [tools.shell]
//! endpoint = "/run"
//! ```

use relay_domain::ToolSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolConfig {
    /// Base URL of the backend (e.g., "http://localhost:8002")
    pub address: Option<String>,
    /// Endpoint path on the backend
    pub endpoint: Option<String>,
    /// Purpose text shown in `tools` and the system prompt
    pub purpose: Option<String>,
    /// Extra aliases, in addition to the built-in ones
    pub aliases: Vec<String>,
}

impl FileToolConfig {
    /// Apply the overrides to a built-in spec.
    pub fn apply(&self, mut spec: ToolSpec) -> ToolSpec {
        if let Some(address) = &self.address {
            spec = spec.with_address(address.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            spec = spec.with_endpoint(endpoint.clone());
        }
        if let Some(purpose) = &self.purpose {
            spec = spec.with_purpose(purpose.clone());
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_domain::{ToolKind, builtin_spec};

    #[test]
    fn test_apply_overrides_only_set_fields() {
        let config: FileToolConfig = toml::from_str(
            r#"
address = "http://10.0.0.5:9000/"
aliases = ["db"]
"#,
        )
        .unwrap();
        let spec = config.apply(builtin_spec(ToolKind::Sql));
        assert_eq!(spec.url(), "http://10.0.0.5:9000/execute_query");
        assert_eq!(spec.purpose, builtin_spec(ToolKind::Sql).purpose);
        assert_eq!(config.aliases, vec!["db".to_string()]);
    }
}
