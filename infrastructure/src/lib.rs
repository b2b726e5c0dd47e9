//! Infrastructure layer for plan-relay
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer (HTTP transport, JSONL run log), the four backend
//! services, and configuration file loading.

pub mod backends;
pub mod config;
pub mod logging;
pub mod transport;

// Re-export commonly used types
pub use backends::{
    BackendApiError, BackendServer, BackendServerError, BackendSettings, EvalSettings,
    FetchSettings, ShellSettings, SqlSettings,
};
pub use config::{ConfigLoadError, ConfigLoader, FileConfig};
pub use logging::JsonlRunLogger;
pub use transport::HttpBackendTransport;
