use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use relay_domain::codes;
use serde::Serialize;

/// Rejection returned by every backend service.
///
/// Serialises as:
/// ```json
/// { "status": "error", "code": "<code>", "detail": "<text>" }
/// ```
/// The code lets a caller tell a malformed request from a policy refusal
/// when both share an HTTP status.
#[derive(Debug)]
pub struct BackendApiError {
    status: StatusCode,
    body: BackendErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendErrorBody {
    pub status: &'static str,
    pub code: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_status: Option<u16>,
}

impl BackendApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: BackendErrorBody {
                status: "error",
                code: code.into(),
                detail: detail.into(),
                remote_status: None,
            },
        }
    }

    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::INVALID_REQUEST, detail)
    }

    pub fn bad_request(code: &str, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, detail)
    }

    pub fn forbidden(code: &str, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, code, detail)
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::REQUEST_TIMEOUT, codes::TIMEOUT, detail)
    }

    pub fn bad_gateway(code: &str, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, code, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, codes::INTERNAL, detail)
    }

    pub fn with_remote_status(mut self, status: u16) -> Self {
        self.body.remote_status = Some(status);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.body.code
    }

    pub fn detail(&self) -> &str {
        &self.body.detail
    }
}

impl IntoResponse for BackendApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Undecodable or incomplete request bodies keep axum's status (400/415/422)
/// but use the common error body.
impl From<JsonRejection> for BackendApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), codes::INVALID_REQUEST, rejection.body_text())
    }
}

impl std::fmt::Display for BackendApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.body.code, self.body.detail)
    }
}
