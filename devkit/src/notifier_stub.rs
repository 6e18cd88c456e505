/*!
Recording notifier and mail transport

Capture what the monitor would have delivered so tests can assert on it.
*/

use async_trait::async_trait;
use diskwatch_agent::notifier::MailTransport;
use diskwatch_agent::{Notifier, NotifyError};
use lettre::Message;
use std::sync::{Arc, Mutex};

/// Keeps every alert message in delivery order. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Usage alerts and failure alerts about exactly `host`
    pub fn messages_for(&self, host: &str) -> Vec<String> {
        let usage_prefix = format!("Warning: {} disk usage at ", host);
        let failure_prefix = format!("Error: disk check failed for {}: ", host);
        self.messages()
            .into_iter()
            .filter(|msg| msg.starts_with(&usage_prefix) || msg.starts_with(&failure_prefix))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) {
        tracing::info!("📨 [MOCK] Notification: {}", message);
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// `MailTransport` that stores messages instead of talking SMTP
#[derive(Clone, Default)]
pub struct RecordingMailTransport {
    sent: Arc<Mutex<Vec<Message>>>,
    fail_with: Option<String>,
}

impl RecordingMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that rejects every message with `reason`
    pub fn failing(reason: &str) -> Self {
        Self {
            sent: Arc::default(),
            fail_with: Some(reason.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    /// Full RFC 5322 text of each accepted message
    pub fn sent_raw(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|msg| String::from_utf8_lossy(&msg.formatted()).to_string())
            .collect()
    }
}

#[async_trait]
impl MailTransport for RecordingMailTransport {
    async fn deliver(&self, message: Message) -> Result<(), NotifyError> {
        if let Some(reason) = &self.fail_with {
            tracing::warn!("⚠️ [MOCK] Rejected mail: {}", reason);
            return Err(NotifyError::Transport(reason.clone()));
        }
        tracing::info!("📤 [MOCK] Accepted mail for {} recipient(s)", message.envelope().to().len());
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_messages_for_matches_exact_host() {
        let notifier = RecordingNotifier::new();
        notifier.notify("Warning: AB disk usage at 90%").await;
        notifier.notify("Warning: B disk usage at 85%").await;
        notifier.notify("Error: disk check failed for B: timeout").await;

        assert_eq!(notifier.count(), 3);
        assert_eq!(notifier.messages_for("AB").len(), 1);
        assert_eq!(notifier.messages_for("B").len(), 2);
        assert!(notifier.messages_for("A").is_empty());

        notifier.clear();
        assert_eq!(notifier.count(), 0);
    }
}
