//! Backend transport port
//!
//! Defines how the dispatcher sends a JSON payload to a backend service.
//! The HTTP adapter lives in the infrastructure layer; tests substitute a
//! mock so no network is needed.

use async_trait::async_trait;
use relay_domain::DispatchErrorKind;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// A response that made it back from a backend, whatever its status.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a usable response.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {detail}")]
pub struct TransportError {
    pub kind: DispatchErrorKind,
    pub detail: String,
}

impl TransportError {
    pub fn new(kind: DispatchErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Unreachable, detail)
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Timeout, detail)
    }
}

/// Port for posting JSON to a backend.
#[async_trait]
pub trait BackendTransport: Send + Sync {
    /// POST `payload` to `url`, giving up after `timeout`.
    ///
    /// Any HTTP status is `Ok`; only failures to get a decodable response
    /// are `Err`.
    async fn post_json(
        &self,
        url: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;
}
