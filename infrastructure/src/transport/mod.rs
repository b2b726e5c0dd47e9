//! Dispatcher transport adapters

mod http;

pub use http::HttpBackendTransport;
