use super::{eval, fetch, shell, sql};
use super::{EvalSettings, FetchSettings, ShellSettings, SqlSettings};
use axum::Router;
use axum::routing::get;
use relay_domain::ToolKind;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum BackendServerError {
    #[error("invalid bind address '{0}'")]
    InvalidAddress(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Settings for all four services
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendSettings {
    pub shell: ShellSettings,
    pub sql: SqlSettings,
    pub eval: EvalSettings,
    pub fetch: FetchSettings,
}

/// The axum router serving one tool kind, plus `GET /health`.
pub fn router_for(kind: ToolKind, settings: &BackendSettings) -> Router {
    let router = match kind {
        ToolKind::Shell => shell::router(settings.shell.clone()),
        ToolKind::Sql => sql::router(settings.sql.clone()),
        ToolKind::Eval => eval::router(settings.eval.clone()),
        ToolKind::Fetch => fetch::router(settings.fetch.clone()),
    };
    router.route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}

/// One running backend service.
///
/// Shuts down gracefully on [`shutdown`](Self::shutdown) or when dropped.
pub struct BackendServer {
    kind: ToolKind,
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl BackendServer {
    /// Bind `bind` (`host:port`, port 0 picks a free one) and start serving.
    pub async fn start(
        kind: ToolKind,
        bind: &str,
        settings: &BackendSettings,
    ) -> Result<Self, BackendServerError> {
        let bind_addr: SocketAddr = bind
            .parse()
            .map_err(|_| BackendServerError::InvalidAddress(bind.to_string()))?;
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| BackendServerError::Bind {
                addr: bind.to_string(),
                source,
            })?;
        let addr = listener
            .local_addr()
            .map_err(|source| BackendServerError::Bind {
                addr: bind.to_string(),
                source,
            })?;

        let app = router_for(kind, settings);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                error!("{} backend stopped with error: {}", kind, e);
            }
        });

        info!("{} backend listening on http://{}", kind, addr);

        Ok(Self {
            kind,
            addr,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL clients should use
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Signal shutdown without waiting.
    pub fn shutdown(&mut self) {
        if let Some(sender) = self.shutdown.take() {
            let _ = sender.send(());
        }
    }

    /// Signal shutdown and wait for in-flight requests to finish.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!("{} backend stopped", self.kind);
    }
}

impl Drop for BackendServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
