//! Shared API Error Taxonomy
//!
//! Every handler returns `Result<_, ApiError>`. The taxonomy maps onto HTTP
//! statuses; bodies are always `{"detail": "..."}` so clients have a single
//! error shape to parse.

use axum::http::header::HeaderValue;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Errors surfaced by Monlight HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or out-of-bounds input. No state was mutated.
    #[error("{0}")]
    Validation(String),

    /// Advertised or actual body size exceeds the service cap.
    #[error("Request body too large")]
    PayloadTooLarge,

    /// Missing or wrong API key.
    #[error("Invalid or missing API key")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    /// Sliding-window limit exceeded; `retry_after` is in seconds.
    #[error("Too many requests")]
    RateLimited { retry_after: u64 },

    /// A capacity-limited resource (the SSE live tail) is saturated.
    #[error("Too many active connections, try again later")]
    ServerBusy,

    /// Transient storage or downstream failure. Logged at error level at the
    /// point of conversion; the client only sees a generic message.
    #[error("Internal server error")]
    Internal,
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Storage error");
        Self::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::ServerBusy => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let Self::RateLimited { retry_after } = self {
            let body = json!({
                "detail": format!("Too many requests. Wait {retry_after} seconds."),
                "retry_after": retry_after,
            });
            let mut response = (status, Json(body)).into_response();
            if let Ok(v) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", v);
            }
            return response;
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
