//! Execution parameters for the dispatcher.
//!
//! [`ExecutionParams`] groups the static parameters that control how
//! [`DispatchActionUseCase`](crate::use_cases::dispatch_action::DispatchActionUseCase)
//! talks to backends. These are application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dispatcher control parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Timeout for each backend request. Every dispatch carries one.
    pub request_timeout: Duration,
    /// Whether a malformed-request rejection gets its one cleanup retry.
    pub retry_on_client_error: bool,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            retry_on_client_error: true,
        }
    }
}

impl ExecutionParams {
    // ==================== Builder Methods ====================

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry_on_client_error(mut self, enabled: bool) -> Self {
        self.retry_on_client_error = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = ExecutionParams::default();
        assert_eq!(params.request_timeout, Duration::from_secs(10));
        assert!(params.retry_on_client_error);
    }

    #[test]
    fn test_builder() {
        let params = ExecutionParams::default()
            .with_request_timeout(Duration::from_millis(250))
            .with_retry_on_client_error(false);

        assert_eq!(params.request_timeout, Duration::from_millis(250));
        assert!(!params.retry_on_client_error);
    }
}
