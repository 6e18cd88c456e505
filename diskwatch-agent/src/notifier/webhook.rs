use super::{section, Notifier};
use crate::error::{ConfigError, NotifyError};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSettings {
    pub webhook_url: String,
}

impl WebhookSettings {
    /// Reads `webhook_url` (or the older `slack_webhook_url`)
    pub fn from_config(config: &Value) -> Result<Self, ConfigError> {
        let url = section(config, &["webhook_url", "slack_webhook_url"])
            .and_then(Value::as_str)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::InvalidNotificationConfig(
                    "webhook notifier needs a non-empty 'webhook_url'".to_string(),
                )
            })?;

        Ok(Self {
            webhook_url: url.to_string(),
        })
    }
}

/// Posts `{"text": message}` to a chat-style incoming webhook
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(settings: WebhookSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: settings.webhook_url,
        }
    }

    pub async fn send(&self, message: &str) -> Result<(), NotifyError> {
        self.client
            .post(&self.webhook_url)
            .json(&serde_json::json!({ "text": message }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) {
        match self.send(message).await {
            Ok(()) => info!("Webhook notification sent: {}", message),
            Err(e) => error!("Failed to send webhook notification: {}", e),
        }
    }
}
