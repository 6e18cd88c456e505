//! SSH-backed disk checker
//!
//! Shells out to the system `ssh` client, one session per check, and
//! runs a `df` pipeline on the remote side.

use super::{CheckOutcome, DiskChecker};
use crate::config::SshSettings;
use crate::error::CheckError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, info};

/// Remote pipeline printing the usage column of the root filesystem
pub const DF_COMMAND: &str = "df -h / | tail -1 | awk '{print $5}'";

pub struct SshDiskChecker {
    settings: SshSettings,
}

impl SshDiskChecker {
    pub fn new(settings: SshSettings) -> Self {
        Self { settings }
    }

    /// Arguments passed to the ssh program for `host`
    pub fn ssh_args(&self, host: &str) -> Vec<String> {
        let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];

        if self.settings.accept_new_host_keys {
            args.push("-o".to_string());
            args.push("StrictHostKeyChecking=accept-new".to_string());
        }
        if let Some(port) = self.settings.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = &self.settings.identity_file {
            args.push("-i".to_string());
            args.push(identity.to_string_lossy().to_string());
        }

        let destination = match self.settings.user.as_deref() {
            Some(user) if !user.is_empty() => format!("{}@{}", user, host),
            _ => host.to_string(),
        };
        args.push("--".to_string());
        args.push(destination);
        args.push(DF_COMMAND.to_string());
        args
    }

    async fn run(&self, host: &str, timeout: Option<Duration>) -> Result<u8, CheckError> {
        if host.trim().is_empty() || host.starts_with('-') {
            return Err(CheckError::InvalidHost(host.to_string()));
        }

        let mut command = AsyncCommand::new(&self.settings.program);
        command
            .args(self.ssh_args(host))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start_time = Instant::now();
        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| CheckError::Timeout(limit))??,
            None => command.output().await?,
        };
        debug!(
            "ssh {} finished in {}ms with {:?}",
            host,
            start_time.elapsed().as_millis(),
            output.status.code()
        );

        if !output.status.success() {
            return Err(CheckError::CommandFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_usage(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl DiskChecker for SshDiskChecker {
    async fn check_disk_usage(&self, host: &str, timeout: Option<Duration>) -> CheckOutcome {
        match self.run(host, timeout).await {
            Ok(percent) => {
                info!("{} disk usage: {}%", host, percent);
                CheckOutcome::Usage(percent)
            }
            Err(e) => {
                error!("Error checking {}: {}", host, e);
                CheckOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Parse the trailing `NN%` token printed by `DF_COMMAND`
pub fn parse_usage(output: &str) -> Result<u8, CheckError> {
    let token = output
        .split_whitespace()
        .last()
        .ok_or_else(|| CheckError::Parse(output.to_string()))?;

    token
        .replace('%', "")
        .parse::<u8>()
        .map_err(|_| CheckError::Parse(output.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_usage() {
        assert_eq!(parse_usage("85%\n").unwrap(), 85);
        assert_eq!(parse_usage("  7%  ").unwrap(), 7);
        assert_eq!(parse_usage("100%").unwrap(), 100);
        assert_eq!(parse_usage("Warning: motd noise\n42%\n").unwrap(), 42);
    }

    #[test]
    fn test_parse_usage_rejects_garbage() {
        assert!(matches!(parse_usage(""), Err(CheckError::Parse(_))));
        assert!(matches!(parse_usage("Use%"), Err(CheckError::Parse(_))));
        assert!(matches!(parse_usage("-"), Err(CheckError::Parse(_))));
        assert!(matches!(parse_usage("-3%"), Err(CheckError::Parse(_))));
    }

    #[test]
    fn test_ssh_args_defaults() {
        let checker = SshDiskChecker::new(SshSettings::default());
        let args = checker.ssh_args("192.168.1.10");
        assert_eq!(
            args,
            vec![
                "-o",
                "BatchMode=yes",
                "-o",
                "StrictHostKeyChecking=accept-new",
                "--",
                "192.168.1.10",
                DF_COMMAND,
            ]
        );
    }

    #[test]
    fn test_ssh_args_with_identity() {
        let checker = SshDiskChecker::new(SshSettings {
            user: Some("monitor".into()),
            port: Some(2222),
            identity_file: Some(PathBuf::from("/etc/diskwatch/id_ed25519")),
            program: "ssh".into(),
            accept_new_host_keys: false,
        });
        let args = checker.ssh_args("nas.local");
        assert_eq!(
            args,
            vec![
                "-o",
                "BatchMode=yes",
                "-p",
                "2222",
                "-i",
                "/etc/diskwatch/id_ed25519",
                "--",
                "monitor@nas.local",
                DF_COMMAND,
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_host_fails_without_spawning() {
        let checker = SshDiskChecker::new(SshSettings::default());
        let outcome = checker.check_disk_usage("  ", None).await;
        assert_eq!(outcome.as_percent(), super::super::FAILURE_SENTINEL);
    }

    #[tokio::test]
    async fn test_option_like_host_is_refused() {
        let checker = SshDiskChecker::new(SshSettings {
            program: "/nonexistent/diskwatch-ssh".into(),
            ..SshSettings::default()
        });
        let host = "-oProxyCommand=touch /tmp/diskwatch";

        let err = checker.run(host, None).await.unwrap_err();
        assert!(matches!(err, CheckError::InvalidHost(ref h) if h == host));

        let args = checker.ssh_args(host);
        let separator = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(args[separator + 1], host);
    }

    #[tokio::test]
    async fn test_missing_program_reports_failure() {
        let checker = SshDiskChecker::new(SshSettings {
            program: "/nonexistent/diskwatch-ssh".into(),
            ..SshSettings::default()
        });
        let outcome = checker
            .check_disk_usage("web1", Some(Duration::from_secs(5)))
            .await;
        assert!(outcome.is_failure());
    }
}
