/*!
Test harness for the disk monitor

Wires a `DiskMonitor` to the in-memory stubs and provides:
- Bounded sweeps through the real `Scheduler`
- Per-host alert expectations
- Stats on checks and alerts
*/

use crate::checker_stub::ScriptedChecker;
use crate::notifier_stub::RecordingNotifier;
use anyhow::Result;
use diskwatch_agent::{DiskMonitor, Scheduler, TickReport};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct TestHarness {
    pub checker: ScriptedChecker,
    pub notifier: RecordingNotifier,
    servers: Vec<String>,
    threshold: u8,
    check_timeout: Option<Duration>,
    alert_on_failure: bool,
    expectations: Vec<Expectation>,
}

#[derive(Debug)]
struct Expectation {
    host: String,
    expected_count: usize,
}

impl TestHarness {
    pub fn new(servers: &[&str], threshold: u8) -> Self {
        tracing_subscriber::fmt().with_test_writer().try_init().ok();

        Self {
            checker: ScriptedChecker::new(),
            notifier: RecordingNotifier::new(),
            servers: servers.iter().map(|s| s.to_string()).collect(),
            threshold,
            check_timeout: None,
            alert_on_failure: false,
            expectations: Vec::new(),
        }
    }

    pub fn with_failure_alerts(mut self, enabled: bool) -> Self {
        self.alert_on_failure = enabled;
        self
    }

    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = Some(timeout);
        self
    }

    /// Fresh monitor sharing the harness stubs
    pub fn monitor(&self) -> DiskMonitor {
        DiskMonitor::new(
            self.servers.clone(),
            self.threshold,
            Arc::new(self.checker.clone()),
            Arc::new(self.notifier.clone()),
        )
        .with_check_timeout(self.check_timeout)
        .with_failure_alerts(self.alert_on_failure)
    }

    pub async fn run_tick(&self) -> TickReport {
        tracing::info!("🔁 Running sweep over {} host(s)", self.servers.len());
        self.monitor().run_check().await
    }

    /// Run `ticks` sweeps through the scheduler with a 1ms interval
    pub async fn run_ticks(&self, ticks: u64) -> u64 {
        Scheduler::new(Duration::from_millis(1), CancellationToken::new())
            .with_max_ticks(ticks)
            .run(&self.monitor())
            .await
    }

    /// Expect `count` alerts about `host` by the time of verification
    pub fn expect_alerts(&mut self, host: &str, count: usize) -> &mut Self {
        self.expectations.push(Expectation {
            host: host.to_string(),
            expected_count: count,
        });
        self
    }

    pub fn verify_expectations(&self) -> Result<()> {
        for expectation in &self.expectations {
            let actual_count = self.notifier.messages_for(&expectation.host).len();
            if actual_count != expectation.expected_count {
                anyhow::bail!(
                    "Expectation failed for host '{}': expected {} alerts, got {}",
                    expectation.host,
                    expectation.expected_count,
                    actual_count
                );
            }
        }

        let expected_total: usize = self.expectations.iter().map(|e| e.expected_count).sum();
        let hosts_covered = self
            .servers
            .iter()
            .all(|s| self.expectations.iter().any(|e| &e.host == s));
        if hosts_covered && self.notifier.count() != expected_total {
            anyhow::bail!(
                "Expected {} alerts in total, got {}: {:?}",
                expected_total,
                self.notifier.count(),
                self.notifier.messages()
            );
        }
        Ok(())
    }

    pub fn get_stats(&self) -> TestStats {
        let mut alerts_per_host = HashMap::new();
        for host in &self.servers {
            let count = self.notifier.messages_for(host).len();
            if count > 0 {
                alerts_per_host.insert(host.clone(), count);
            }
        }

        TestStats {
            checks: self.checker.calls().len(),
            total_alerts: self.notifier.count(),
            alerts_per_host,
        }
    }

    pub fn reset(&mut self) {
        self.checker.clear();
        self.notifier.clear();
        self.expectations.clear();
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct TestStats {
    pub checks: usize,
    pub total_alerts: usize,
    pub alerts_per_host: HashMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_harness_basic_functionality() {
        let mut harness = TestHarness::new(&["web1", "web2"], 80);
        harness.checker.set_outcome("web1", diskwatch_agent::CheckOutcome::Usage(81));
        harness.checker.set_outcome("web2", diskwatch_agent::CheckOutcome::Usage(12));

        harness.expect_alerts("web1", 1).expect_alerts("web2", 0);
        harness.run_tick().await;
        harness.verify_expectations().unwrap();

        let stats = harness.get_stats();
        assert_eq!(stats.checks, 2);
        assert_eq!(stats.total_alerts, 1);
        assert_eq!(stats.alerts_per_host.get("web1"), Some(&1));

        harness.reset();
        assert_eq!(harness.get_stats().checks, 0);
    }

    #[tokio::test]
    async fn test_failed_expectation_is_reported() {
        let mut harness = TestHarness::new(&["web1"], 80);
        harness.checker.set_outcome("web1", diskwatch_agent::CheckOutcome::Usage(10));

        harness.expect_alerts("web1", 1);
        harness.run_tick().await;
        assert!(harness.verify_expectations().is_err());
    }
}
