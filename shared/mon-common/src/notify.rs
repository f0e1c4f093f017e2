//! Alert Notification Sink
//!
//! Alert delivery is a best-effort side effect: the `Notifier` trait hides
//! the transport, callers use [`spawn_notify`] to fire-and-forget, and
//! failures are logged and swallowed. The production implementation posts to
//! the Postmark email API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

/// Postmark's single-message send endpoint.
const POSTMARK_EMAIL_URL: &str = "https://api.postmarkapp.com/email";

/// Outbound alert sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str, recipients: &[String]) -> Result<()>;
}

/// Notifier delivering plain-text email through the Postmark HTTP API.
pub struct PostmarkNotifier {
    client: reqwest::Client,
    token: String,
    from: String,
}

impl PostmarkNotifier {
    pub fn new(token: impl Into<String>, from: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            token: token.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl Notifier for PostmarkNotifier {
    async fn notify(&self, subject: &str, body: &str, recipients: &[String]) -> Result<()> {
        if recipients.is_empty() {
            return Ok(());
        }

        let payload = json!({
            "From": self.from,
            "To": recipients.join(","),
            "Subject": subject,
            "TextBody": body,
            "MessageStream": "outbound",
        });

        self.client
            .post(POSTMARK_EMAIL_URL)
            .header("X-Postmark-Server-Token", &self.token)
            .json(&payload)
            .send()
            .await
            .context("Postmark request failed")?
            .error_for_status()
            .context("Postmark rejected the message")?;

        Ok(())
    }
}

/// Notifier that drops everything. Used when alerting is unconfigured and in
/// tests.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _subject: &str, _body: &str, _recipients: &[String]) -> Result<()> {
        Ok(())
    }
}

/// Dispatch a notification without blocking the caller. Delivery failures
/// are logged at warn level; the triggering request is never affected.
pub fn spawn_notify(
    notifier: Arc<dyn Notifier>,
    subject: String,
    body: String,
    recipients: Vec<String>,
) {
    if recipients.is_empty() {
        return;
    }
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&subject, &body, &recipients).await {
            warn!(error = %e, subject = %subject, "Alert delivery failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Notifier recording every dispatch, for asserting alert behavior.
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<(String, String, Vec<String>)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, subject: &str, body: &str, recipients: &[String]) -> Result<()> {
            self.sent.lock().unwrap().push((
                subject.to_owned(),
                body.to_owned(),
                recipients.to_vec(),
            ));
            Ok(())
        }
    }

    #[tokio::test]
    async fn spawn_notify_skips_empty_recipient_lists() {
        let notifier = Arc::new(RecordingNotifier {
            sent: Mutex::new(Vec::new()),
        });
        spawn_notify(notifier.clone(), "s".into(), "b".into(), Vec::new());
        tokio::task::yield_now().await;
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn spawn_notify_delivers() {
        let notifier = Arc::new(RecordingNotifier {
            sent: Mutex::new(Vec::new()),
        });
        spawn_notify(
            notifier.clone(),
            "subject".into(),
            "body".into(),
            vec!["ops@example.com".into()],
        );
        // The dispatch task is spawned; give it a chance to run.
        for _ in 0..50 {
            if !notifier.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "subject");
    }
}
