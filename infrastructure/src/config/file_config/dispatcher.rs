//! Dispatcher configuration from TOML (`[dispatcher]` section)
//!
//! ```toml
//! [dispatcher]
//! timeout_secs = 10
//! retry_on_client_error = true
//! ```

use relay_application::ExecutionParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDispatcherConfig {
    /// Per-request timeout towards backends
    pub timeout_secs: u64,
    /// Allow the single cleanup retry on malformed-request rejections
    pub retry_on_client_error: bool,
}

impl Default for FileDispatcherConfig {
    fn default() -> Self {
        let params = ExecutionParams::default();
        Self {
            timeout_secs: params.request_timeout.as_secs(),
            retry_on_client_error: params.retry_on_client_error,
        }
    }
}

impl FileDispatcherConfig {
    pub fn to_execution_params(&self) -> ExecutionParams {
        ExecutionParams::default()
            .with_request_timeout(Duration::from_secs(self.timeout_secs))
            .with_retry_on_client_error(self.retry_on_client_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_execution_params() {
        let config = FileDispatcherConfig::default();
        assert_eq!(config.to_execution_params(), ExecutionParams::default());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: FileDispatcherConfig = toml::from_str("timeout_secs = 3").unwrap();
        let params = config.to_execution_params();
        assert_eq!(params.request_timeout, Duration::from_secs(3));
        assert!(params.retry_on_client_error);
    }
}
