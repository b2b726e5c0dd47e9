//! Dispatch Action use case.
//!
//! Sends one [`ParsedAction`] to its backend and turns whatever happens into
//! an [`ExecutionResult`]. Resolution goes through the [`ToolRegistry`], the
//! request goes through the [`BackendTransport`] port, and the single retry
//! rule lives in [`relay_domain::execution::retry`].
//!
//! ```text
//! resolve ──▶ POST ──▶ 2xx ──────────────────────────▶ Success
//!   │           │
//!   │           ├──▶ transport failure ──────────────▶ DispatchError
//!   │           │
//!   │           └──▶ non-2xx ──▶ retry_action()? ─┬─▶ POST once more (final)
//!   │                                             └─▶ BackendError
//!   └──▶ unknown tool ───────────────────────────────▶ DispatchError(ToolNotFound)
//! ```

use crate::config::ExecutionParams;
use crate::ports::backend_transport::{BackendTransport, TransportResponse};
use crate::ports::progress::{NoProgress, PipelineProgressNotifier};
use crate::ports::run_logger::{NoRunLogger, RunEvent, RunLogger};
use relay_domain::execution::MAX_RETRIES;
use relay_domain::{
    BackendErrorKind, BackendFailure, DispatchErrorKind, DispatchFailure, ExecutionResult,
    ParsedAction, PipelineState, ToolRegistry, retry_action,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a dispatch produced, plus how it got there.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub result: ExecutionResult,
    /// The last payload sent (the cleaned one if a retry happened)
    pub action: ParsedAction,
    /// Requests sent: 0 when resolution failed, otherwise 1 or 2
    pub attempts: usize,
}

impl DispatchReport {
    pub fn retried(&self) -> bool {
        self.attempts > 1
    }
}

/// Use case for dispatching a parsed action to its backend.
pub struct DispatchActionUseCase {
    registry: Arc<ToolRegistry>,
    transport: Arc<dyn BackendTransport>,
    params: ExecutionParams,
    run_logger: Arc<dyn RunLogger>,
}

impl Clone for DispatchActionUseCase {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            transport: self.transport.clone(),
            params: self.params.clone(),
            run_logger: self.run_logger.clone(),
        }
    }
}

impl DispatchActionUseCase {
    pub fn new(
        registry: Arc<ToolRegistry>,
        transport: Arc<dyn BackendTransport>,
        params: ExecutionParams,
    ) -> Self {
        Self {
            registry,
            transport,
            params,
            run_logger: Arc::new(NoRunLogger),
        }
    }

    /// Create with a run logger.
    pub fn with_run_logger(mut self, logger: Arc<dyn RunLogger>) -> Self {
        self.run_logger = logger;
        self
    }

    pub fn params(&self) -> &ExecutionParams {
        &self.params
    }

    /// Dispatch and return only the result.
    pub async fn execute(&self, action: &ParsedAction) -> ExecutionResult {
        self.execute_with_progress(action, &NoProgress).await.result
    }

    /// Dispatch with progress callbacks.
    pub async fn execute_with_progress(
        &self,
        action: &ParsedAction,
        progress: &dyn PipelineProgressNotifier,
    ) -> DispatchReport {
        let spec = match self.registry.resolve(&action.tool) {
            Ok(spec) => spec,
            Err(e) => {
                warn!("Dispatch aborted: {}", e);
                let result = ExecutionResult::DispatchError(DispatchFailure::new(
                    DispatchErrorKind::ToolNotFound,
                    e.to_string(),
                ));
                progress.on_result(&result);
                return DispatchReport {
                    result,
                    action: action.clone(),
                    attempts: 0,
                };
            }
        };
        let url = spec.url();

        let mut current = action.clone();
        let mut attempts = 0;
        loop {
            attempts += 1;
            progress.on_dispatch(&current, attempts);
            info!("Dispatching {} to {} (attempt {})", spec.name, url, attempts);
            debug!("Payload: {}", current.payload_value());

            let sent = self
                .transport
                .post_json(&url, &current.payload_value(), self.params.request_timeout)
                .await;
            self.log_attempt(&current, &url, attempts, &sent);

            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    warn!("Dispatch to {} failed: {}", url, e);
                    let result = ExecutionResult::DispatchError(
                        DispatchFailure::new(e.kind, e.detail).with_url(url.clone()),
                    );
                    progress.on_result(&result);
                    return DispatchReport {
                        result,
                        action: current,
                        attempts,
                    };
                }
            };

            if response.is_success() {
                let result = ExecutionResult::Success {
                    tool: spec.name.clone(),
                    status_code: response.status,
                    body: response.body,
                };
                progress.on_result(&result);
                return DispatchReport {
                    result,
                    action: current,
                    attempts,
                };
            }

            let failure = BackendFailure::from_response(&spec.name, response.status, response.body);

            if attempts <= MAX_RETRIES
                && self.params.retry_on_client_error
                && let Some(retried) = retry_action(
                    &current,
                    spec,
                    failure.status_code,
                    failure.code.as_deref(),
                )
            {
                warn!(
                    "{} rejected the request ({}: {}), retrying once with cleaned payload",
                    spec.name, failure.status_code, failure.detail
                );
                progress.on_state(PipelineState::Retrying);
                current = retried;
                continue;
            }

            match failure.kind {
                BackendErrorKind::RateLimited | BackendErrorKind::Unavailable => warn!(
                    "{} is {} ({}), not retrying",
                    spec.name, failure.kind, failure.status_code
                ),
                _ => warn!(
                    "{} rejected the request: {} {} {}",
                    spec.name,
                    failure.status_code,
                    failure.code.as_deref().unwrap_or("-"),
                    failure.detail
                ),
            }
            let result = ExecutionResult::BackendError(failure);
            progress.on_result(&result);
            return DispatchReport {
                result,
                action: current,
                attempts,
            };
        }
    }

    fn log_attempt(
        &self,
        action: &ParsedAction,
        url: &str,
        attempt: usize,
        sent: &Result<TransportResponse, crate::ports::backend_transport::TransportError>,
    ) {
        let (status, error) = match sent {
            Ok(response) => (Some(response.status), None),
            Err(e) => (None, Some(e.to_string())),
        };
        self.run_logger.log(RunEvent::new(
            "dispatch_attempt",
            json!({
                "tool": action.tool,
                "url": url,
                "attempt": attempt,
                "payload": action.payload_value(),
                "status": status,
                "error": error,
            }),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::backend_transport::TransportError;
    use async_trait::async_trait;
    use relay_domain::codes;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    // ==================== Test Mocks ====================

    struct MockTransport {
        responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
        requests: Mutex<Vec<(String, Value)>>,
    }

    impl MockTransport {
        fn new(responses: Vec<Result<TransportResponse, TransportError>>) -> Self {
            Self {
                responses: Mutex::new(VecDeque::from(responses)),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<(String, Value)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BackendTransport for MockTransport {
        async fn post_json(
            &self,
            url: &str,
            payload: &Value,
            _timeout: Duration,
        ) -> Result<TransportResponse, TransportError> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), payload.clone()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::unreachable("no more responses")))
        }
    }

    struct RecordingLogger {
        events: Mutex<Vec<&'static str>>,
    }

    impl RunLogger for RecordingLogger {
        fn log(&self, event: RunEvent) {
            self.events.lock().unwrap().push(event.event_type);
        }
    }

    fn error_body(code: &str, detail: &str) -> Value {
        json!({"status": "error", "code": code, "detail": detail})
    }

    fn dispatcher(transport: Arc<MockTransport>) -> DispatchActionUseCase {
        DispatchActionUseCase::new(
            Arc::new(ToolRegistry::canonical()),
            transport,
            ExecutionParams::default(),
        )
    }

    fn sql_action(query: &str) -> ParsedAction {
        ParsedAction::new("sql")
            .with_arg("query", query)
            .with_arg("db_name", "system")
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_success_passes_body_through() {
        let body = json!({"status": "success", "results": [], "count": 0});
        let transport = Arc::new(MockTransport::new(vec![Ok(TransportResponse::new(
            200,
            body.clone(),
        ))]));
        let report = dispatcher(transport.clone())
            .execute_with_progress(&sql_action("SELECT 1"), &NoProgress)
            .await;

        assert_eq!(
            report.result,
            ExecutionResult::Success {
                tool: "sql".to_string(),
                status_code: 200,
                body,
            }
        );
        assert_eq!(report.attempts, 1);
        let requests = transport.requests();
        assert_eq!(requests[0].0, "http://localhost:8002/execute_query");
        assert_eq!(requests[0].1["db_name"], "system");
    }

    #[tokio::test]
    async fn test_client_error_retries_once_with_cleaned_payload() {
        let transport = Arc::new(MockTransport::new(vec![
            Ok(TransportResponse::new(
                400,
                error_body(codes::SQL_ERROR, "You can only execute one statement at a time."),
            )),
            Ok(TransportResponse::new(200, json!({"status": "success", "results": [], "count": 0}))),
        ]));
        let report = dispatcher(transport.clone())
            .execute_with_progress(&sql_action("SELECT 1;"), &NoProgress)
            .await;

        assert!(report.result.is_success());
        assert_eq!(report.attempts, 2);
        assert!(report.retried());
        assert_eq!(report.action.get_string("query"), Some("SELECT 1"));
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].1["query"], "SELECT 1;");
        assert_eq!(requests[1].1["query"], "SELECT 1");
    }

    #[tokio::test]
    async fn test_retry_response_is_final() {
        let transport = Arc::new(MockTransport::new(vec![
            Ok(TransportResponse::new(400, error_body(codes::SQL_ERROR, "first"))),
            Ok(TransportResponse::new(400, error_body(codes::SQL_ERROR, "second"))),
            Ok(TransportResponse::new(200, json!({}))),
        ]));
        let report = dispatcher(transport.clone())
            .execute_with_progress(&sql_action("SELECT 1;;"), &NoProgress)
            .await;

        match report.result {
            ExecutionResult::BackendError(failure) => {
                assert_eq!(failure.detail, "second");
                assert_eq!(failure.kind, BackendErrorKind::ClientError);
            }
            other => panic!("expected BackendError, got {:?}", other),
        }
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_policy_rejection_not_retried() {
        let transport = Arc::new(MockTransport::new(vec![Ok(TransportResponse::new(
            400,
            error_body(codes::READ_ONLY_VIOLATION, "Only SELECT queries are allowed."),
        ))]));
        let report = dispatcher(transport.clone())
            .execute_with_progress(&sql_action("DELETE FROM t;"), &NoProgress)
            .await;

        match &report.result {
            ExecutionResult::BackendError(failure) => {
                assert_eq!(failure.kind, BackendErrorKind::PolicyViolation);
                assert_eq!(failure.code.as_deref(), Some(codes::READ_ONLY_VIOLATION));
            }
            other => panic!("expected BackendError, got {:?}", other),
        }
        assert_eq!(report.attempts, 1);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_forbidden_not_retried() {
        let transport = Arc::new(MockTransport::new(vec![Ok(TransportResponse::new(
            403,
            error_body(codes::DENYLISTED_TOKEN, "Forbidden token: `import`"),
        ))]));
        let action = ParsedAction::new("eval").with_arg("code", "`import os`");
        let report = dispatcher(transport.clone())
            .execute_with_progress(&action, &NoProgress)
            .await;

        assert!(matches!(report.result, ExecutionResult::BackendError(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_and_unavailable_classified() {
        for (status, kind) in [
            (429, BackendErrorKind::RateLimited),
            (503, BackendErrorKind::Unavailable),
        ] {
            let transport = Arc::new(MockTransport::new(vec![Ok(TransportResponse::new(
                status,
                json!("slow down"),
            ))]));
            let report = dispatcher(transport.clone())
                .execute_with_progress(&sql_action("SELECT 1;"), &NoProgress)
                .await;
            match report.result {
                ExecutionResult::BackendError(failure) => assert_eq!(failure.kind, kind),
                other => panic!("expected BackendError, got {:?}", other),
            }
            assert_eq!(transport.requests().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_dispatch_error() {
        let transport = Arc::new(MockTransport::new(vec![Err(TransportError::unreachable(
            "connection refused",
        ))]));
        let report = dispatcher(transport.clone())
            .execute_with_progress(&sql_action("SELECT 1;"), &NoProgress)
            .await;

        match report.result {
            ExecutionResult::DispatchError(failure) => {
                assert_eq!(failure.kind, DispatchErrorKind::Unreachable);
                assert_eq!(
                    failure.url.as_deref(),
                    Some("http://localhost:8002/execute_query")
                );
            }
            other => panic!("expected DispatchError, got {:?}", other),
        }
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_never_sends() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let action = ParsedAction::new("telnet").with_arg("command", "open host");
        let report = dispatcher(transport.clone())
            .execute_with_progress(&action, &NoProgress)
            .await;

        match report.result {
            ExecutionResult::DispatchError(failure) => {
                assert_eq!(failure.kind, DispatchErrorKind::ToolNotFound);
                assert!(failure.url.is_none());
            }
            other => panic!("expected DispatchError, got {:?}", other),
        }
        assert_eq!(report.attempts, 0);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_retry_can_be_disabled() {
        let transport = Arc::new(MockTransport::new(vec![Ok(TransportResponse::new(
            400,
            error_body(codes::SQL_ERROR, "syntax"),
        ))]));
        let dispatcher = DispatchActionUseCase::new(
            Arc::new(ToolRegistry::canonical()),
            transport.clone(),
            ExecutionParams::default().with_retry_on_client_error(false),
        );
        let result = dispatcher.execute(&sql_action("SELECT 1;")).await;

        assert!(matches!(result, ExecutionResult::BackendError(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_each_attempt_is_logged() {
        let transport = Arc::new(MockTransport::new(vec![
            Ok(TransportResponse::new(400, error_body(codes::SQL_ERROR, "x"))),
            Ok(TransportResponse::new(200, json!({}))),
        ]));
        let logger = Arc::new(RecordingLogger {
            events: Mutex::new(Vec::new()),
        });
        let dispatcher = dispatcher(transport).with_run_logger(logger.clone());
        dispatcher.execute(&sql_action("SELECT 1;")).await;

        assert_eq!(
            *logger.events.lock().unwrap(),
            vec!["dispatch_attempt", "dispatch_attempt"]
        );
    }
}
