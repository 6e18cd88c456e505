//! Error types for the agent
//!
//! Only `ConfigError` ever reaches the driver. Check and notification
//! errors are logged where they happen and never stop a sweep.

use std::path::PathBuf;
use std::time::Duration;

/// Startup configuration errors (fatal)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("config file {0} must contain an object at the top level")]
    NotAnObject(PathBuf),
    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("unsupported notification type: {0}")]
    UnsupportedNotificationType(String),
    #[error("invalid notification config: {0}")]
    InvalidNotificationConfig(String),
}

impl ConfigError {
    pub(crate) fn field(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Reasons a single host check can fail
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("invalid host {0:?}")]
    InvalidHost(String),
    #[error("failed to start remote command: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("remote command timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote command exited with {code:?}: {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },
    #[error("unexpected df output: {0:?}")]
    Parse(String),
}

/// Notification delivery errors
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to build mail message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("mail transport error: {0}")]
    Transport(String),
}
