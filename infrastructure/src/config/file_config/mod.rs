//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into domain/application
//! types ([`ToolRegistry`], [`ExecutionParams`]) and backend settings.

mod backends;
mod dispatcher;
mod logging;
mod tools;

pub use backends::{
    FileBackendsConfig, FileEvalBackendConfig, FileFetchBackendConfig, FileShellBackendConfig,
    FileSqlBackendConfig,
};
pub use dispatcher::FileDispatcherConfig;
pub use logging::FileLoggingConfig;
pub use tools::FileToolConfig;

use relay_application::ExecutionParams;
use relay_domain::{
    ConfigIssue, ConfigIssueCode, ToolKind, ToolRegistry, builtin_spec,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Dispatcher settings
    pub dispatcher: FileDispatcherConfig,
    /// Per-tool overrides, keyed by canonical tool name
    pub tools: BTreeMap<String, FileToolConfig>,
    /// Backend service settings
    pub backends: FileBackendsConfig,
    /// Log file settings
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        // 1. Tool sections
        for (name, tool) in &self.tools {
            if ToolKind::from_name(name).is_none() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::UnknownTool { name: name.clone() },
                    format!(
                        "[tools.{}]: unknown tool (expected one of shell, sql, eval, fetch)",
                        name
                    ),
                ));
                continue;
            }
            if let Some(address) = &tool.address
                && !(address.starts_with("http://") || address.starts_with("https://"))
            {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::InvalidAddress {
                        tool: name.clone(),
                        address: address.clone(),
                    },
                    format!("tools.{}.address: '{}' is not an http(s) URL", name, address),
                ));
            }
        }

        // 2. Alias conflicts
        let mut seen: HashMap<String, String> = HashMap::new();
        for kind in ToolKind::ALL {
            for alias in kind.default_aliases() {
                seen.insert(alias.to_ascii_lowercase(), kind.as_str().to_string());
            }
        }
        for (name, tool) in &self.tools {
            for alias in &tool.aliases {
                let key = alias.to_ascii_lowercase();
                let shadows_tool =
                    ToolKind::from_name(&key).is_some_and(|kind| kind.as_str() != name);
                let taken = seen.get(&key).is_some_and(|owner| owner != name);
                if shadows_tool || taken {
                    issues.push(ConfigIssue::warning(
                        ConfigIssueCode::ConflictingAlias { alias: alias.clone() },
                        format!(
                            "tools.{}.aliases: '{}' already names another tool and will be ignored or override it",
                            name, alias
                        ),
                    ));
                }
                seen.insert(key, name.clone());
            }
        }

        // 3. Zero timeouts
        for (field, value) in [
            ("dispatcher.timeout_secs", self.dispatcher.timeout_secs),
            ("backends.shell.timeout_secs", self.backends.shell.timeout_secs),
            ("backends.eval.timeout_secs", self.backends.eval.timeout_secs),
            (
                "backends.fetch.default_timeout_secs",
                self.backends.fetch.default_timeout_secs,
            ),
        ] {
            if value == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ZeroTimeout {
                        field: field.to_string(),
                    },
                    format!("{}: must be greater than zero", field),
                ));
            }
        }

        // 4. Default database
        if !self
            .backends
            .sql
            .databases
            .contains_key(&self.backends.sql.default_db)
        {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::UnknownDefaultDatabase {
                    name: self.backends.sql.default_db.clone(),
                },
                format!(
                    "backends.sql.default_db: '{}' is not listed in backends.sql.databases",
                    self.backends.sql.default_db
                ),
            ));
        }

        // 5. Bind addresses
        for (backend, value) in self.backends.binds() {
            if value.parse::<SocketAddr>().is_err() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::InvalidBindAddress {
                        backend: backend.to_string(),
                        value: value.to_string(),
                    },
                    format!("backends.{}.bind: '{}' is not a host:port address", backend, value),
                ));
            }
        }

        issues
    }

    /// Build the tool registry: built-ins, then overrides and extra aliases.
    pub fn to_registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::canonical();
        for kind in ToolKind::ALL {
            let mut spec = builtin_spec(kind);
            if kind == ToolKind::Sql {
                spec = spec.with_parameter_default("db_name", self.backends.sql.default_db.clone());
            }
            if let Some(tool) = self.tools.get(kind.as_str()) {
                spec = tool.apply(spec);
                registry = registry
                    .register_aliases(tool.aliases.iter().map(|alias| (alias.as_str(), kind.as_str())));
            }
            registry = registry.register(spec);
        }
        registry
    }

    pub fn to_execution_params(&self) -> ExecutionParams {
        self.dispatcher.to_execution_params()
    }
}
