//! Fleet sweep
//!
//! `DiskMonitor` owns one checker and one notifier behind trait objects
//! and visits every configured host in order, one at a time.

use crate::checker::{CheckOutcome, CheckResult, DiskChecker};
use crate::notifier::Notifier;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub fn format_alert(host: &str, usage: i32) -> String {
    format!("Warning: {} disk usage at {}%", host, usage)
}

pub fn format_failure_alert(host: &str, reason: &str) -> String {
    format!("Error: disk check failed for {}: {}", host, reason)
}

/// Everything one sweep observed
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub results: Vec<CheckResult>,
    pub alerts_sent: usize,
}

impl TickReport {
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| r.outcome.is_failure())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

pub struct DiskMonitor {
    servers: Vec<String>,
    threshold: u8,
    checker: Arc<dyn DiskChecker>,
    notifier: Arc<dyn Notifier>,
    check_timeout: Option<Duration>,
    alert_on_failure: bool,
}

impl DiskMonitor {
    pub fn new(
        servers: Vec<String>,
        threshold: u8,
        checker: Arc<dyn DiskChecker>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            servers,
            threshold,
            checker,
            notifier,
            check_timeout: None,
            alert_on_failure: false,
        }
    }

    pub fn with_check_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// Send a "check failed" alert for hosts that could not be checked
    pub fn with_failure_alerts(mut self, enabled: bool) -> Self {
        self.alert_on_failure = enabled;
        self
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// One sequential sweep over every host.
    ///
    /// The failure sentinel is negative and the threshold unsigned, so a
    /// failed check never counts as a breach.
    pub async fn run_check(&self) -> TickReport {
        debug!(
            "Checking {} host(s) against {}% threshold",
            self.servers.len(),
            self.threshold
        );
        let mut report = TickReport::default();

        for host in &self.servers {
            let outcome = self
                .checker
                .check_disk_usage(host, self.check_timeout)
                .await;
            let usage = outcome.as_percent();

            if usage >= i32::from(self.threshold) {
                self.notifier.notify(&format_alert(host, usage)).await;
                report.alerts_sent += 1;
            } else if let CheckOutcome::Failed(reason) = &outcome {
                if self.alert_on_failure {
                    self.notifier
                        .notify(&format_failure_alert(host, reason))
                        .await;
                    report.alerts_sent += 1;
                }
            }

            report.results.push(CheckResult {
                host: host.clone(),
                outcome,
            });
        }

        info!(
            "Checked {} host(s): {} alert(s) sent, {} check(s) failed",
            report.results.len(),
            report.alerts_sent,
            report.failure_count()
        );
        report
    }
}
