use axum::{
    Json,
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub mod products;

/// Error envelope returned to HTTP clients.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub error: String,
}

/// Canonical API error that converts into the shared JSON envelope.
///
/// `message` is the fixed, client-facing summary of what failed; `detail`
/// carries the underlying cause and is echoed as the envelope's `error` field.
#[derive(Debug, Error)]
#[error("{message}: {detail}")]
pub struct ApiError {
    #[source]
    source: Option<anyhow::Error>,
    status: StatusCode,
    message: String,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            source: None,
            status,
            message: message.into(),
            detail: detail.into(),
        }
    }

    /// Wrap a lower-level failure; its display text becomes the `error` field.
    pub fn with_source(
        status: StatusCode,
        message: impl Into<String>,
        err: impl Into<anyhow::Error>,
    ) -> Self {
        let source = err.into();
        Self {
            detail: source.to_string(),
            source: Some(source),
            status,
            message: message.into(),
        }
    }

    /// Build a resource-not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, "not found")
    }

    /// Build a method-not-allowed error (HTTP 405).
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, message, "method not allowed")
    }

    /// Build a service unavailable error (HTTP 503).
    pub fn service_unavailable(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message, detail)
    }

    /// Expose the HTTP status code for logging/tests.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError {
            source,
            status,
            message,
            detail,
        } = self;

        if status.is_server_error() {
            if let Some(err) = &source {
                tracing::error!(
                    error = %err,
                    status = %status,
                    message = message.as_str(),
                    "api error (critical)"
                );
            } else {
                tracing::error!(
                    status = %status,
                    message = message.as_str(),
                    detail = detail.as_str(),
                    "api error (critical)"
                );
            }
        } else {
            tracing::warn!(
                status = %status,
                message = message.as_str(),
                detail = detail.as_str(),
                "api error"
            );
        }

        let payload = ErrorResponse {
            success: false,
            message,
            error: detail,
        };
        let mut response = (status, Json(payload)).into_response();
        response
            .extensions_mut()
            .insert(ErrorEnvelopeApplied::default());
        response
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct ErrorEnvelopeApplied;

/// Middleware that rewrites Axum default errors into the shared envelope.
pub async fn ensure_error_envelope(req: Request<Body>, next: Next) -> Response {
    let response = next.run(req).await;
    let status = response.status();

    if (status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::NOT_FOUND)
        && response
            .extensions()
            .get::<ErrorEnvelopeApplied>()
            .is_none()
    {
        return match status {
            StatusCode::METHOD_NOT_ALLOWED => {
                ApiError::method_not_allowed("method not allowed").into_response()
            }
            StatusCode::NOT_FOUND => ApiError::not_found("route not found").into_response(),
            _ => unreachable!(),
        };
    }

    response
}

/// Fallback handler ensuring unknown routes return the API envelope.
pub async fn fallback_handler() -> ApiError {
    ApiError::not_found("route not found")
}
