//! Logging configuration from TOML (`[logging]` section)
//!
//! ```toml
//! [logging]
//! dir = "logs"                 # daily-rolling tracing log files
//! run_log = "logs/runs.jsonl"  # one JSON line per pipeline run
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for rolling log files; console only when unset
    pub dir: Option<PathBuf>,
    /// File name prefix for rolling log files
    pub file_prefix: String,
    /// JSONL run log path; disabled when unset
    pub run_log: Option<PathBuf>,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_prefix: "plan-relay.log".to_string(),
            run_log: None,
        }
    }
}
