use super::{section, Notifier};
use crate::error::{ConfigError, NotifyError};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

pub const ALERT_SUBJECT: &str = "Disk Usage Alert";

const DEFAULT_SMTP_PORT: u16 = 25;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MailSettings {
    /// `host` or `host:port`
    #[serde(alias = "smtp_server")]
    pub server: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(alias = "from_addr")]
    pub from: String,
    #[serde(alias = "to_addrs")]
    pub to: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub starttls: bool,
}

impl MailSettings {
    /// Reads the `mail` (or `email`) section of `notification_config`
    pub fn from_config(config: &Value) -> Result<Self, ConfigError> {
        let raw = section(config, &["mail", "email"]).ok_or_else(|| {
            ConfigError::InvalidNotificationConfig(
                "mail notifier needs a 'mail' section".to_string(),
            )
        })?;

        let settings: MailSettings = serde_json::from_value(raw.clone())
            .map_err(|e| ConfigError::InvalidNotificationConfig(format!("mail: {}", e)))?;

        if settings.server.trim().is_empty() {
            return Err(ConfigError::InvalidNotificationConfig(
                "mail: 'server' must not be empty".to_string(),
            ));
        }
        if settings.to.is_empty() {
            return Err(ConfigError::InvalidNotificationConfig(
                "mail: 'to' needs at least one recipient".to_string(),
            ));
        }
        Ok(settings)
    }

    /// Explicit `port` wins over a `host:port` or `[v6]:port` server string.
    /// A bare IPv6 address is never split.
    pub fn host_and_port(&self) -> (String, u16) {
        let server = self.server.trim();
        let (host, embedded) = split_server(server);
        let port = self.port.or(embedded).unwrap_or(DEFAULT_SMTP_PORT);
        (host.to_string(), port)
    }
}

fn split_server(server: &str) -> (&str, Option<u16>) {
    if let Some(rest) = server.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((host, "")) => (host, None),
            Some((host, tail)) => match tail.strip_prefix(':').map(str::parse::<u16>) {
                Some(Ok(port)) => (host, Some(port)),
                _ => (server, None),
            },
            None => (server, None),
        };
    }

    if server.matches(':').count() != 1 {
        return (server, None);
    }
    match server.split_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => (host, Some(port)),
            Err(_) => (server, None),
        },
        None => (server, None),
    }
}

/// Seam between message building and the SMTP client
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: Message) -> Result<(), NotifyError>;
}

#[async_trait]
impl MailTransport for AsyncSmtpTransport<Tokio1Executor> {
    async fn deliver(&self, message: Message) -> Result<(), NotifyError> {
        AsyncTransport::send(self, message).await?;
        Ok(())
    }
}

pub struct MailNotifier {
    transport: Box<dyn MailTransport>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl MailNotifier {
    pub fn new<T>(settings: &MailSettings, transport: T) -> Result<Self, ConfigError>
    where
        T: MailTransport + 'static,
    {
        let from = parse_mailbox(&settings.from)?;
        let to = settings
            .to
            .iter()
            .map(|addr| parse_mailbox(addr))
            .collect::<Result<Vec<_>, _>>()?;

        if to.is_empty() {
            return Err(ConfigError::InvalidNotificationConfig(
                "mail: 'to' needs at least one recipient".to_string(),
            ));
        }

        Ok(Self {
            transport: Box::new(transport),
            from,
            to,
        })
    }

    /// Plain SMTP relay, with STARTTLS and credentials when configured
    pub fn smtp(settings: MailSettings) -> Result<Self, ConfigError> {
        let (host, port) = settings.host_and_port();

        let builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
                .map_err(|e| ConfigError::InvalidNotificationConfig(format!("mail: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host.as_str())
        };
        let mut builder = builder.port(port);

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Self::new(&settings, builder.build())
    }

    pub fn build_message(&self, body: &str) -> Result<Message, NotifyError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(ALERT_SUBJECT)
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        Ok(builder.body(body.to_string())?)
    }

    pub async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let email = self.build_message(message)?;
        self.transport.deliver(email).await
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn notify(&self, message: &str) {
        match self.send(message).await {
            Ok(()) => info!("Email notification sent: {}", message),
            Err(e) => error!("Failed to send email notification: {}", e),
        }
    }
}

fn parse_mailbox(addr: &str) -> Result<Mailbox, ConfigError> {
    addr.trim()
        .parse::<Mailbox>()
        .map_err(|e| ConfigError::InvalidNotificationConfig(format!("mail: '{}': {}", addr, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingTransport {
        sent: Arc<Mutex<Vec<Message>>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn deliver(&self, message: Message) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    struct RejectingTransport;

    #[async_trait]
    impl MailTransport for RejectingTransport {
        async fn deliver(&self, _message: Message) -> Result<(), NotifyError> {
            Err(NotifyError::Transport("relay access denied".to_string()))
        }
    }

    fn settings() -> MailSettings {
        MailSettings::from_config(&json!({
            "mail": {
                "server": "smtp.example.com",
                "from": "diskwatch@example.com",
                "to": ["ops@example.com", "dba@example.com"]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_settings_accept_legacy_keys() {
        let settings = MailSettings::from_config(&json!({
            "email": {
                "smtp_server": "relay.local:587",
                "from_addr": "a@local",
                "to_addrs": ["b@local"]
            }
        }))
        .unwrap();
        assert_eq!(settings.host_and_port(), ("relay.local".to_string(), 587));
        assert_eq!(settings.to, vec!["b@local"]);
    }

    #[test]
    fn test_settings_validation() {
        let empty_server = json!({ "mail": { "server": "", "from": "a@local", "to": ["b@local"] } });
        assert!(MailSettings::from_config(&empty_server).is_err());

        let no_recipients = json!({ "mail": { "server": "relay", "from": "a@local", "to": [] } });
        assert!(MailSettings::from_config(&no_recipients).is_err());

        let bad_address = MailSettings {
            from: "not an address".to_string(),
            ..settings()
        };
        assert!(MailNotifier::new(&bad_address, RecordingTransport::default()).is_err());
    }

    #[test]
    fn test_host_and_port() {
        let mut settings = settings();
        assert_eq!(settings.host_and_port(), ("smtp.example.com".to_string(), 25));

        settings.server = "smtp.example.com:2525".to_string();
        assert_eq!(settings.host_and_port(), ("smtp.example.com".to_string(), 2525));

        settings.port = Some(465);
        assert_eq!(settings.host_and_port(), ("smtp.example.com".to_string(), 465));
    }

    #[test]
    fn test_host_and_port_ipv6() {
        let mut settings = settings();

        settings.server = "fe80::1".to_string();
        assert_eq!(settings.host_and_port(), ("fe80::1".to_string(), 25));

        settings.server = "[::1]:2525".to_string();
        assert_eq!(settings.host_and_port(), ("::1".to_string(), 2525));

        settings.server = "[::1]".to_string();
        assert_eq!(settings.host_and_port(), ("::1".to_string(), 25));
    }

    #[tokio::test]
    async fn test_sends_plain_text_alert() {
        let transport = RecordingTransport::default();
        let notifier = MailNotifier::new(&settings(), transport.clone()).unwrap();

        notifier.send("Warning: db1 disk usage at 93%").await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].envelope().to().len(), 2);

        let raw = String::from_utf8(sent[0].formatted()).unwrap();
        assert!(raw.contains("Subject: Disk Usage Alert"));
        assert!(raw.contains("From: diskwatch@example.com"));
        assert!(raw.contains("ops@example.com"));
        assert!(raw.contains("dba@example.com"));
        assert!(raw.contains("Warning: db1 disk usage at 93%"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_swallowed_by_notify() {
        let notifier = MailNotifier::new(&settings(), RejectingTransport).unwrap();
        assert!(matches!(
            notifier.send("Warning: db1 disk usage at 93%").await,
            Err(NotifyError::Transport(_))
        ));
        notifier.notify("Warning: db1 disk usage at 93%").await;
    }
}
