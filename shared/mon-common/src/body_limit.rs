//! Request Body Size Gate
//!
//! Rejects oversize requests by advertised `Content-Length` before any body
//! bytes are read. Services pair this with `DefaultBodyLimit::max(cap)` so
//! chunked bodies without a length header are still bounded at read time.

use axum::extract::{Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;

/// Per-service body cap in bytes, shared with the middleware as state.
#[derive(Debug, Clone, Copy)]
pub struct BodyCap(pub usize);

/// Middleware rejecting requests whose advertised length exceeds the cap.
///
/// A body of exactly the cap passes; cap + 1 is rejected with 413.
pub async fn content_length_gate(
    State(cap): State<BodyCap>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let advertised = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(len) = advertised {
        if len > cap.0 {
            return Err(ApiError::PayloadTooLarge);
        }
    }

    Ok(next.run(request).await)
}
