//! Capability backends served over HTTP.
//!
//! Each backend is one axum router with a single JSON endpoint. Every
//! rejection renders as `{"status": "error", "code", "detail"}` through
//! [`BackendApiError`].
//!
//! | Kind | Endpoint | Request |
//! |------|----------|---------|
//! | shell | `POST /execute_shell` | `{command}` |
//! | sql | `POST /execute_query` | `{query, db_name}` |
//! | eval | `POST /execute_code` | `{code}` |
//! | fetch | `POST /fetch_url` | `{url, params?, timeout?}` |

pub mod argv;
pub mod error;
pub mod eval;
pub mod fetch;
pub mod server;
pub mod shell;
pub mod sql;

pub use error::BackendApiError;
pub use eval::EvalSettings;
pub use fetch::FetchSettings;
pub use server::{BackendServer, BackendServerError, BackendSettings, router_for};
pub use shell::ShellSettings;
pub use sql::SqlSettings;
