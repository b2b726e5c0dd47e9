//! Configuration file loading for plan-relay
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `PLAN_RELAY_*` environment variables (`__` separates sections)
//! 2. `--config <path>` specified file
//! 3. Project root: `./relay.toml` or `./.relay.toml`
//! 4. Global: `$XDG_CONFIG_HOME/plan-relay/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileBackendsConfig, FileConfig, FileDispatcherConfig, FileEvalBackendConfig,
    FileFetchBackendConfig, FileLoggingConfig, FileShellBackendConfig, FileSqlBackendConfig,
    FileToolConfig,
};
pub use loader::{ConfigLoadError, ConfigLoader};
