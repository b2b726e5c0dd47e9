//! reqwest adapter for the [`BackendTransport`] port.

use async_trait::async_trait;
use relay_application::{BackendTransport, TransportError, TransportResponse};
use relay_domain::DispatchErrorKind;
use serde_json::Value;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::debug;

/// Posts JSON to backends over HTTP.
///
/// One [`reqwest::Client`] is shared by all requests; the per-request
/// timeout comes from the caller.
#[derive(Debug, Clone, Default)]
pub struct HttpBackendTransport {
    client: reqwest::Client,
}

impl HttpBackendTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BackendTransport for HttpBackendTransport {
    async fn post_json(
        &self,
        url: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        debug!("POST {} ({:?} timeout)", url, timeout);

        let response = self
            .client
            .post(url)
            .json(payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(classify_error)?;

        Ok(TransportResponse::new(status, decode_body(&text)))
    }
}

/// JSON when the body parses, the raw text otherwise.
fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn classify_error(err: reqwest::Error) -> TransportError {
    let detail = error_chain(&err);
    let kind = if err.is_timeout() {
        DispatchErrorKind::Timeout
    } else if is_dns_failure(&detail) {
        DispatchErrorKind::DnsFailure
    } else if err.is_connect() || err.is_request() {
        DispatchErrorKind::Unreachable
    } else if err.is_body() || err.is_decode() {
        DispatchErrorKind::InvalidResponse
    } else {
        DispatchErrorKind::Other
    };
    TransportError::new(kind, detail)
}

fn is_dns_failure(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    lower.contains("dns error") || lower.contains("failed to lookup address")
}

/// Display of an error and all its sources, joined by `: `.
fn error_chain(err: &dyn StdError) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = inner.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(decode_body("Internal Server Error"), json!("Internal Server Error"));
        assert_eq!(decode_body("  "), Value::Null);
    }

    #[test]
    fn test_dns_failure_detection() {
        assert!(is_dns_failure("error sending request: dns error: failed to lookup address"));
        assert!(!is_dns_failure("connection refused"));
    }

    #[tokio::test]
    async fn test_echoes_status_and_json_body() {
        let router = Router::new().route(
            "/execute_query",
            post(|Json(body): Json<Value>| async move {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"status": "error", "code": "sql_error", "echo": body})),
                )
            }),
        );
        let base = serve(router).await;

        let transport = HttpBackendTransport::new();
        let response = transport
            .post_json(
                &format!("{}/execute_query", base),
                &json!({"query": "SELECT 1;"}),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(response.status, 400);
        assert_eq!(response.body["code"], "sql_error");
        assert_eq!(response.body["echo"]["query"], "SELECT 1;");
    }

    #[tokio::test]
    async fn test_plain_text_body_becomes_string() {
        let router = Router::new().route(
            "/x",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = serve(router).await;

        let response = HttpBackendTransport::new()
            .post_json(&format!("{}/x", base), &json!({}), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.body, json!("boom"));
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        // bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = HttpBackendTransport::new()
            .post_json(&format!("http://{}/x", addr), &json!({}), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.kind, DispatchErrorKind::Unreachable);
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let router = Router::new().route(
            "/slow",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let base = serve(router).await;

        let err = HttpBackendTransport::new()
            .post_json(&format!("{}/slow", base), &json!({}), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert_eq!(err.kind, DispatchErrorKind::Timeout);
    }
}
