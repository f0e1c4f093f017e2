//! Request/Response Types

use mon_common::time::fmt_ts;
use mon_common::ApiError;
use serde::{Deserialize, Serialize};

use crate::db::{ErrorGroup, NewReport, Occurrence};

const MAX_PROJECT: usize = 100;
const MAX_ENVIRONMENT: usize = 20;
const MAX_EXCEPTION_TYPE: usize = 200;

/// Submitted error report.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub project: String,
    #[serde(default)]
    pub environment: Option<String>,
    pub exception_type: String,
    pub message: String,
    pub traceback: String,
    #[serde(default)]
    pub request_url: Option<String>,
    #[serde(default)]
    pub request_method: Option<String>,
    #[serde(default)]
    pub request_headers: Option<serde_json::Value>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
}

impl IngestRequest {
    /// Validate field presence and caps; no state is touched on failure.
    pub fn into_report(self) -> Result<NewReport, ApiError> {
        fn required(name: &str, value: &str, max: usize) -> Result<(), ApiError> {
            if value.trim().is_empty() {
                return Err(ApiError::Validation(format!("{name} is required")));
            }
            if value.len() > max {
                return Err(ApiError::Validation(format!(
                    "{name} exceeds {max} characters"
                )));
            }
            Ok(())
        }

        required("project", &self.project, MAX_PROJECT)?;
        required("exception_type", &self.exception_type, MAX_EXCEPTION_TYPE)?;
        if self.message.is_empty() {
            return Err(ApiError::Validation("message is required".into()));
        }
        if self.traceback.is_empty() {
            return Err(ApiError::Validation("traceback is required".into()));
        }

        let environment = match self.environment {
            Some(env) if !env.is_empty() => {
                if env.len() > MAX_ENVIRONMENT {
                    return Err(ApiError::Validation(format!(
                        "environment exceeds {MAX_ENVIRONMENT} characters"
                    )));
                }
                env
            }
            _ => "prod".to_owned(),
        };

        Ok(NewReport {
            project: self.project,
            environment,
            exception_type: self.exception_type,
            message: self.message,
            traceback: self.traceback,
            request_url: self.request_url,
            request_method: self.request_method,
            request_headers: self
                .request_headers
                .as_ref()
                .map(|v| v.to_string()),
            user_id: self.user_id,
            extra: self.extra.as_ref().map(|v| v.to_string()),
        })
    }
}

/// Ingest response: which branch executed, the group it landed in, and the
/// group's new occurrence count.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub group_id: i64,
    pub count: i64,
}

/// Group listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub project: Option<String>,
    pub environment: Option<String>,
    pub resolved: Option<bool>,
    pub source: Option<String>,
    pub session_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Group as rendered on the API.
#[derive(Debug, Serialize)]
pub struct GroupView {
    pub id: i64,
    pub fingerprint: String,
    pub project: String,
    pub environment: String,
    pub exception_type: String,
    pub message: String,
    pub traceback: String,
    pub count: i64,
    pub first_seen: String,
    pub last_seen: String,
    pub resolved: bool,
    pub resolved_at: Option<String>,
}

impl From<ErrorGroup> for GroupView {
    fn from(g: ErrorGroup) -> Self {
        Self {
            id: g.id,
            fingerprint: g.fingerprint,
            project: g.project,
            environment: g.environment,
            exception_type: g.exception_type,
            message: g.message,
            traceback: g.traceback,
            count: g.count,
            first_seen: fmt_ts(g.first_seen),
            last_seen: fmt_ts(g.last_seen),
            resolved: g.resolved,
            resolved_at: g.resolved_at.map(fmt_ts),
        }
    }
}

/// Occurrence as rendered on the API. JSON columns are re-inflated so
/// clients receive objects rather than strings.
#[derive(Debug, Serialize)]
pub struct OccurrenceView {
    pub id: i64,
    pub timestamp: String,
    pub request_url: Option<String>,
    pub request_method: Option<String>,
    pub request_headers: Option<serde_json::Value>,
    pub user_id: Option<String>,
    pub extra: Option<serde_json::Value>,
    pub traceback: String,
}

impl From<Occurrence> for OccurrenceView {
    fn from(o: Occurrence) -> Self {
        let inflate = |s: Option<String>| {
            s.and_then(|raw| serde_json::from_str(&raw).ok())
        };
        Self {
            id: o.id,
            timestamp: fmt_ts(o.ts),
            request_url: o.request_url,
            request_method: o.request_method,
            request_headers: inflate(o.request_headers),
            user_id: o.user_id,
            extra: inflate(o.extra),
            traceback: o.traceback,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub total: i64,
    pub errors: Vec<GroupView>,
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    #[serde(flatten)]
    pub group: GroupView,
    pub occurrences: Vec<OccurrenceView>,
}
