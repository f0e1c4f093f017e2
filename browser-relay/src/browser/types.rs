//! Browser Payload Types

use serde::Deserialize;

/// An error reported by the browser SDK.
#[derive(Debug, Deserialize)]
pub struct BrowserErrorRequest {
    #[serde(default)]
    pub exception_type: Option<String>,
    pub message: String,
    /// Raw browser stack trace (Chrome or Firefox format).
    #[serde(default)]
    pub stack: Option<String>,
    /// Page URL the error occurred on.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    /// Release identifier used for source-map lookup.
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub extra: Option<serde_json::Map<String, serde_json::Value>>,
}

/// A metrics submission from the browser SDK: points plus the session
/// context used for label enrichment.
#[derive(Debug, Deserialize)]
pub struct BrowserMetricsRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    /// Page URL; its path component becomes the `page` label.
    #[serde(default)]
    pub url: Option<String>,
    pub points: Vec<BrowserMetricPoint>,
}

/// One metric point as submitted by the browser.
#[derive(Debug, Deserialize)]
pub struct BrowserMetricPoint {
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: String,
    pub value: f64,
    #[serde(default)]
    pub labels: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Extract the path component of a page URL for the `page` label.
pub fn page_of(url: &str) -> String {
    crate::sourcemap::normalize_frame_url(url)
        .split(['?', '#'])
        .next()
        .unwrap_or("/")
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_strips_host_query_and_fragment() {
        assert_eq!(page_of("https://app.example.com/checkout?step=2"), "/checkout");
        assert_eq!(page_of("https://app.example.com/a/b#frag"), "/a/b");
        assert_eq!(page_of("/already/path"), "/already/path");
    }
}
