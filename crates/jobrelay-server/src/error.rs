use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jobrelay_core::Error as CoreError;

/// Unified error type for HTTP responses. Wraps `anyhow::Error` so handlers
/// can use `?` on anything, and downcasts to the core taxonomy to pick a
/// status. Bodies always use the gateway envelope:
/// `{"code": <status>, "message": <string>}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(CoreError::Validation(msg.into()).into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(e) = self.0.downcast_ref::<CoreError>() {
            match e {
                CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                CoreError::Auth(_) => StatusCode::UNAUTHORIZED,
                CoreError::ProviderNotFound(_) => StatusCode::NOT_FOUND,
                CoreError::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                CoreError::Upstream(_) | CoreError::Decode(_) => StatusCode::BAD_GATEWAY,
                CoreError::Store(_) | CoreError::ProviderExists(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            // Detail stays in the log; the body carries the opaque message.
            let detail = self
                .0
                .downcast_ref::<CoreError>()
                .and_then(|e| e.detail())
                .unwrap_or_default();
            tracing::error!(error = %self.0, detail, "request failed");
        }

        let body = serde_json::json!({
            "code": status.as_u16(),
            "message": self.0.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
