//! Alert delivery
//!
//! `Notifier::notify` never fails: each implementation logs delivery
//! errors itself so a broken webhook or mail relay cannot abort a sweep.
//! The fallible `send` methods on the concrete types are what `notify`
//! wraps.

mod mail;
mod webhook;

pub use mail::{MailNotifier, MailSettings, MailTransport, ALERT_SUBJECT};
pub use webhook::{WebhookNotifier, WebhookSettings};

use crate::config::{MonitorConfig, NotificationType};
use crate::error::ConfigError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}

/// Build the notifier selected by `notification_type`
pub fn build_notifier(config: &MonitorConfig) -> Result<Arc<dyn Notifier>, ConfigError> {
    match config.notification_type {
        NotificationType::Webhook => {
            let settings = WebhookSettings::from_config(&config.notification_config)?;
            Ok(Arc::new(WebhookNotifier::new(settings)))
        }
        NotificationType::Mail => {
            let settings = MailSettings::from_config(&config.notification_config)?;
            Ok(Arc::new(MailNotifier::smtp(settings)?))
        }
    }
}

pub(crate) fn section<'a>(config: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| config.get(*key))
}
