//! Downstream Forwarding
//!
//! Posts transformed payloads to the Error Tracker and Metrics Collector
//! with internal credentials and relays the downstream response verbatim.
//! An unreachable downstream maps to 502.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::warn;

/// Shared forwarding client.
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// POST a JSON body downstream and mirror the response (status + body)
    /// back to the browser.
    pub async fn post_json(
        &self,
        base_url: &str,
        path: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> Response {
        let url = format!("{}{}", base_url.trim_end_matches('/'), path);
        let result = self
            .client
            .post(&url)
            .header("X-API-Key", api_key)
            .json(body)
            .send()
            .await;

        match result {
            Ok(downstream) => {
                let status = StatusCode::from_u16(downstream.status().as_u16())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                let bytes = downstream.bytes().await.unwrap_or_default();
                Response::builder()
                    .status(status)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(bytes))
                    .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
            }
            Err(e) => {
                warn!(error = %e, url = %url, "Downstream forward failed");
                let body = serde_json::json!({ "detail": "upstream service unavailable" });
                Response::builder()
                    .status(StatusCode::BAD_GATEWAY)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
            }
        }
    }
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}
