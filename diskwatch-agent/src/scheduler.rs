//! Periodic sweep loop
//!
//! Runs a sweep, sleeps for the interval, and repeats until the shutdown
//! token is cancelled or an optional tick budget is spent.

use crate::monitor::DiskMonitor;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct Scheduler {
    interval: Duration,
    shutdown: CancellationToken,
    max_ticks: Option<u64>,
}

impl Scheduler {
    pub fn new(interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            interval,
            shutdown,
            max_ticks: None,
        }
    }

    /// Stop after `ticks` completed sweeps
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Returns the number of sweeps that ran to completion
    pub async fn run(&self, monitor: &DiskMonitor) -> u64 {
        let mut ticks = 0u64;

        loop {
            if self.max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, abandoning sweep");
                    break;
                }
                report = monitor.run_check() => {
                    ticks += 1;
                    debug!(
                        "Sweep {} results: {}",
                        ticks,
                        serde_json::to_string(&report.results).unwrap_or_default()
                    );
                }
            }

            if self.max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{CheckOutcome, DiskChecker};
    use crate::notifier::Notifier;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[derive(Default)]
    struct CountingChecker(AtomicUsize);

    #[async_trait]
    impl DiskChecker for CountingChecker {
        async fn check_disk_usage(&self, _host: &str, _timeout: Option<Duration>) -> CheckOutcome {
            self.0.fetch_add(1, Ordering::SeqCst);
            CheckOutcome::Usage(50)
        }
    }

    struct SilentNotifier;

    #[async_trait]
    impl Notifier for SilentNotifier {
        async fn notify(&self, _message: &str) {}
    }

    fn monitor(checker: Arc<CountingChecker>) -> DiskMonitor {
        DiskMonitor::new(
            vec!["web1".into(), "web2".into()],
            80,
            checker,
            Arc::new(SilentNotifier),
        )
    }

    #[tokio::test]
    async fn test_runs_bounded_number_of_ticks() {
        let checker = Arc::new(CountingChecker::default());
        let scheduler = Scheduler::new(Duration::from_millis(1), CancellationToken::new())
            .with_max_ticks(3);

        let ticks = scheduler.run(&monitor(checker.clone())).await;

        assert_eq!(ticks, 3);
        assert_eq!(checker.0.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_cancel_during_sleep_stops_promptly() {
        let checker = Arc::new(CountingChecker::default());
        let scheduler = Scheduler::new(Duration::from_secs(3600), CancellationToken::new());
        let token = scheduler.shutdown_token();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let start = Instant::now();
        let ticks = scheduler.run(&monitor(checker.clone())).await;

        assert_eq!(ticks, 1);
        assert_eq!(checker.0.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_already_cancelled_runs_nothing() {
        let checker = Arc::new(CountingChecker::default());
        let token = CancellationToken::new();
        token.cancel();

        let ticks = Scheduler::new(Duration::from_millis(1), token)
            .run(&monitor(checker.clone()))
            .await;

        assert_eq!(ticks, 0);
        assert_eq!(checker.0.load(Ordering::SeqCst), 0);
    }
}
