//! Backend service configuration from TOML (`[backends.*]` sections)
//!
//! ```toml
//! [backends.shell]
//! bind = "127.0.0.1:8001"
//! timeout_secs = 10
//!
//! [backends.sql]
//! default_db = "system"
//!
//! [backends.sql.databases]
//! system = "system/system_stm.sqlite"
//! memory = "memory/memory.sqlite"
//!
//! [backends.eval]
//! extra_denylist = ["string.rep"]
//!
//! [backends.fetch]
//! max_content_chars = 2000
//! ```

use crate::backends::{BackendSettings, EvalSettings, FetchSettings, ShellSettings, SqlSettings};
use relay_domain::{DEFAULT_DB_NAME, ToolKind, tool::builtin::default_port};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

fn default_bind(kind: ToolKind) -> String {
    format!("127.0.0.1:{}", default_port(kind))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendsConfig {
    pub shell: FileShellBackendConfig,
    pub sql: FileSqlBackendConfig,
    pub eval: FileEvalBackendConfig,
    pub fetch: FileFetchBackendConfig,
}

impl FileBackendsConfig {
    pub fn to_settings(&self) -> BackendSettings {
        BackendSettings {
            shell: self.shell.to_settings(),
            sql: self.sql.to_settings(),
            eval: self.eval.to_settings(),
            fetch: self.fetch.to_settings(),
        }
    }

    pub fn bind_for(&self, kind: ToolKind) -> &str {
        match kind {
            ToolKind::Shell => &self.shell.bind,
            ToolKind::Sql => &self.sql.bind,
            ToolKind::Eval => &self.eval.bind,
            ToolKind::Fetch => &self.fetch.bind,
        }
    }

    /// `(backend name, bind value)` for every backend
    pub fn binds(&self) -> [(&'static str, &str); 4] {
        [
            ("shell", self.shell.bind.as_str()),
            ("sql", self.sql.bind.as_str()),
            ("eval", self.eval.bind.as_str()),
            ("fetch", self.fetch.bind.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileShellBackendConfig {
    pub bind: String,
    /// Hard ceiling per command; the process group is killed after it
    pub timeout_secs: u64,
    /// Per-stream output cap
    pub max_output_bytes: usize,
    pub working_dir: Option<PathBuf>,
}

impl Default for FileShellBackendConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(ToolKind::Shell),
            timeout_secs: 10,
            max_output_bytes: 1024 * 1024,
            working_dir: None,
        }
    }
}

impl FileShellBackendConfig {
    pub fn to_settings(&self) -> ShellSettings {
        ShellSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            max_output_bytes: self.max_output_bytes,
            working_dir: self.working_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSqlBackendConfig {
    pub bind: String,
    /// Permitted database identifiers and their files
    pub databases: BTreeMap<String, PathBuf>,
    /// Identifier used when a query names none
    pub default_db: String,
    /// Rows returned at most per query
    pub max_rows: usize,
}

impl Default for FileSqlBackendConfig {
    fn default() -> Self {
        let mut databases = BTreeMap::new();
        databases.insert(
            DEFAULT_DB_NAME.to_string(),
            PathBuf::from("system/system_stm.sqlite"),
        );
        Self {
            bind: default_bind(ToolKind::Sql),
            databases,
            default_db: DEFAULT_DB_NAME.to_string(),
            max_rows: 1000,
        }
    }
}

impl FileSqlBackendConfig {
    pub fn to_settings(&self) -> SqlSettings {
        SqlSettings {
            databases: self.databases.clone(),
            default_db: self.default_db.clone(),
            max_rows: self.max_rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEvalBackendConfig {
    pub bind: String,
    pub timeout_secs: u64,
    /// Lua VM memory ceiling
    pub memory_limit_bytes: usize,
    /// Tokens rejected in addition to the built-in denylist
    pub extra_denylist: Vec<String>,
}

impl Default for FileEvalBackendConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(ToolKind::Eval),
            timeout_secs: 5,
            memory_limit_bytes: 16 * 1024 * 1024,
            extra_denylist: Vec::new(),
        }
    }
}

impl FileEvalBackendConfig {
    pub fn to_settings(&self) -> EvalSettings {
        EvalSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            memory_limit: self.memory_limit_bytes,
            extra_denylist: self.extra_denylist.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileFetchBackendConfig {
    pub bind: String,
    /// Used when the request carries no `timeout`
    pub default_timeout_secs: u64,
    /// Upper bound for a requested `timeout`
    pub max_timeout_secs: u64,
    /// Characters of body returned
    pub max_content_chars: usize,
    pub user_agent: String,
}

impl Default for FileFetchBackendConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(ToolKind::Fetch),
            default_timeout_secs: 8,
            max_timeout_secs: 30,
            max_content_chars: 2000,
            user_agent: format!("plan-relay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FileFetchBackendConfig {
    pub fn to_settings(&self) -> FetchSettings {
        FetchSettings {
            default_timeout: Duration::from_secs(self.default_timeout_secs),
            max_timeout: Duration::from_secs(self.max_timeout_secs.max(self.default_timeout_secs)),
            max_content_chars: self.max_content_chars,
            user_agent: self.user_agent.clone(),
            allow_internal: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_binds_follow_tool_ports() {
        let config = FileBackendsConfig::default();
        assert_eq!(
            config.binds(),
            [
                ("shell", "127.0.0.1:8001"),
                ("sql", "127.0.0.1:8002"),
                ("eval", "127.0.0.1:8003"),
                ("fetch", "127.0.0.1:8004"),
            ]
        );
    }

    #[test]
    fn test_sql_databases_from_toml() {
        let config: FileBackendsConfig = toml::from_str(
            r#"
[sql]
default_db = "memory"

[sql.databases]
memory = "/var/lib/relay/memory.sqlite"
"#,
        )
        .unwrap();
        assert_eq!(config.sql.default_db, "memory");
        assert_eq!(config.sql.databases.len(), 1);
        let settings = config.sql.to_settings();
        assert_eq!(
            settings.databases.get("memory"),
            Some(&PathBuf::from("/var/lib/relay/memory.sqlite"))
        );
    }

    #[test]
    fn test_fetch_max_timeout_never_below_default() {
        let config = FileFetchBackendConfig {
            default_timeout_secs: 20,
            max_timeout_secs: 5,
            ..Default::default()
        };
        let settings = config.to_settings();
        assert_eq!(settings.max_timeout, Duration::from_secs(20));
    }
}
