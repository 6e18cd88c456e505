//! Configuration management
//!
//! Handles:
//! - Built-in defaults for the fleet, threshold and poll interval
//! - Field-by-field overrides from a JSON or TOML file
//! - Validation of ranges and enum values
//! - A sorted, redacted dump for diagnostic logging

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Config file used when `DISKWATCH_CONFIG` is not set
pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const CONFIG_ENV_VAR: &str = "DISKWATCH_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorConfig {
    pub servers: Vec<String>,
    /// Alert when usage is at or above this percentage (0-100)
    pub threshold: u8,
    /// Seconds to sleep between sweeps
    pub interval: u64,
    pub log_level: LogLevel,
    pub notification_type: NotificationType,
    /// Shape depends on `notification_type`, see `notifier::build_notifier`
    pub notification_config: Value,
    pub ssh: SshSettings,
    /// Per-host check timeout in seconds, `None` leaves it to the transport
    pub check_timeout: Option<u64>,
    /// Send a distinct alert when a host cannot be checked
    pub alert_on_failure: bool,
    /// Unknown top-level keys, kept verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Options passed to the `ssh` client used by the checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    pub user: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<PathBuf>,
    pub program: String,
    pub accept_new_host_keys: bool,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            user: None,
            port: None,
            identity_file: None,
            program: "ssh".to_string(),
            accept_new_host_keys: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            // tracing has nothing above error
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" | "FATAL" => Ok(LogLevel::Critical),
            other => Err(ConfigError::field(
                "log_level",
                format!("unknown level '{}'", other),
            )),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = ConfigError;

    // `Self::Error` would collide with the `Error` variant
    fn try_from(value: String) -> Result<Self, ConfigError> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NotificationType {
    Webhook,
    Mail,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Webhook => "webhook",
            NotificationType::Mail => "mail",
        }
    }
}

impl FromStr for NotificationType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webhook" | "slack" => Ok(NotificationType::Webhook),
            "mail" | "email" => Ok(NotificationType::Mail),
            _ => Err(ConfigError::UnsupportedNotificationType(s.to_string())),
        }
    }
}

impl TryFrom<String> for NotificationType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NotificationType> for String {
    fn from(kind: NotificationType) -> Self {
        kind.as_str().to_string()
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            servers: vec!["192.168.1.10".to_string(), "192.168.1.11".to_string()],
            threshold: 80,
            interval: 60,
            log_level: LogLevel::Info,
            notification_type: NotificationType::Webhook,
            notification_config: serde_json::json!({
                "webhook_url": "http://localhost:5000/notify",
                "mail": { "server": "", "from": "", "to": [] }
            }),
            ssh: SshSettings::default(),
            check_timeout: None,
            alert_on_failure: false,
            extra: BTreeMap::new(),
        }
    }
}

impl MonitorConfig {
    /// Defaults, overridden by `path` when it is given and exists
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let Some(path) = path else {
            return Ok(config);
        };
        if !path.exists() {
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let overrides = parse_document(path, &content)?;
        config.apply_overrides(overrides)?;
        Ok(config)
    }

    /// Shallow override: each top-level key replaces the matching field
    /// wholesale after validation. Unknown keys land in `extra`.
    pub fn apply_overrides(&mut self, overrides: Map<String, Value>) -> Result<(), ConfigError> {
        for (key, value) in overrides {
            match key.as_str() {
                "servers" => self.servers = parse_servers(value)?,
                "threshold" => self.threshold = parse_threshold(&value)?,
                "interval" => self.interval = parse_positive("interval", &value)?,
                "log_level" => self.log_level = expect_str("log_level", &value)?.parse()?,
                "notification_type" => {
                    self.notification_type = expect_str("notification_type", &value)?.parse()?
                }
                "notification_config" => {
                    if !value.is_object() {
                        return Err(ConfigError::field("notification_config", "expected an object"));
                    }
                    self.notification_config = value;
                }
                "ssh" => {
                    self.ssh = serde_json::from_value(value)
                        .map_err(|e| ConfigError::field("ssh", e.to_string()))?
                }
                "check_timeout" => {
                    self.check_timeout = match value {
                        Value::Null => None,
                        other => Some(parse_positive("check_timeout", &other)?),
                    }
                }
                "alert_on_failure" => {
                    self.alert_on_failure = value
                        .as_bool()
                        .ok_or_else(|| ConfigError::field("alert_on_failure", "expected a boolean"))?
                }
                _ => {
                    self.extra.insert(key, value);
                }
            }
        }
        Ok(())
    }

    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn check_timeout_duration(&self) -> Option<Duration> {
        self.check_timeout.map(Duration::from_secs)
    }

    /// Pretty JSON with sorted keys and passwords masked
    pub fn to_pretty_string(&self) -> String {
        match serde_json::to_value(self) {
            Ok(mut value) => {
                redact_secrets(&mut value);
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| format!("{:?}", self))
            }
            Err(_) => format!("{:?}", self),
        }
    }
}

impl fmt::Display for MonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_pretty_string())
    }
}

/// `$DISKWATCH_CONFIG`, or `config.json` in the working directory
pub fn config_file_path() -> PathBuf {
    std::env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn parse_document(path: &Path, content: &str) -> Result<Map<String, Value>, ConfigError> {
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);

    let value: Value = if is_toml {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    } else {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    };

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::NotAnObject(path.to_path_buf())),
    }
}

fn expect_str<'a>(field: &'static str, value: &'a Value) -> Result<&'a str, ConfigError> {
    value
        .as_str()
        .ok_or_else(|| ConfigError::field(field, "expected a string"))
}

fn parse_servers(value: Value) -> Result<Vec<String>, ConfigError> {
    let servers: Vec<String> = serde_json::from_value(value)
        .map_err(|_| ConfigError::field("servers", "expected a list of strings"))?;

    if servers.iter().any(|s| s.trim().is_empty()) {
        return Err(ConfigError::field("servers", "host names must not be empty"));
    }
    if let Some(bad) = servers.iter().find(|s| s.trim_start().starts_with('-')) {
        return Err(ConfigError::field(
            "servers",
            format!("'{}' is not a host name", bad),
        ));
    }
    Ok(servers)
}

fn parse_threshold(value: &Value) -> Result<u8, ConfigError> {
    match value.as_u64() {
        Some(n) if n <= 100 => Ok(n as u8),
        _ => Err(ConfigError::field(
            "threshold",
            format!("expected an integer between 0 and 100, got {}", value),
        )),
    }
}

fn parse_positive(field: &'static str, value: &Value) -> Result<u64, ConfigError> {
    match value.as_u64() {
        Some(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::field(
            field,
            format!("expected a positive number of seconds, got {}", value),
        )),
    }
}

fn redact_secrets(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if key == "password" && !inner.is_null() {
                    *inner = Value::String("***".to_string());
                } else {
                    redact_secrets(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_secrets),
        _ => {}
    }
}
