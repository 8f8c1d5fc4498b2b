//! Slack-style incoming-webhook notifier

use aegis_core::AegisError;
use aegis_executor::Notifier;
use std::time::Duration;
use tracing::{debug, warn};

/// Posts `{"text": ...}` to a webhook; unset URL disables it
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookNotifier {
    /// Create notifier; `None` or a blank URL yields a disabled notifier
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self, AegisError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AegisError::collaborator("notifier", e.to_string()))?;
        Ok(Self {
            client,
            url: url.filter(|u| !u.trim().is_empty()),
        })
    }

    /// Whether a webhook is configured
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, text: &str) -> bool {
        let Some(url) = &self.url else {
            debug!("Webhook not configured, skipping notification");
            return false;
        };
        let result = self
            .client
            .post(url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        match result {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Webhook notification failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_is_skipped() {
        let notifier = WebhookNotifier::new(None, Duration::from_secs(1)).unwrap();
        assert!(!notifier.is_configured());
        assert!(!notifier.send("hello").await);

        let blank = WebhookNotifier::new(Some("  ".to_string()), Duration::from_secs(1)).unwrap();
        assert!(!blank.is_configured());
    }
}
