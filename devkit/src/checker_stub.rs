/*!
Scripted disk checker for tests without SSH

Each host gets either a fixed outcome or a queue of outcomes consumed one
per check. Every call is recorded for assertions.
*/

use async_trait::async_trait;
use diskwatch_agent::{CheckOutcome, DiskChecker};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckCall {
    pub host: String,
    pub timeout: Option<Duration>,
}

/// Stand-in for `SshDiskChecker`. Clones share state.
#[derive(Clone, Default)]
pub struct ScriptedChecker {
    fixed: Arc<Mutex<HashMap<String, CheckOutcome>>>,
    queued: Arc<Mutex<HashMap<String, VecDeque<CheckOutcome>>>>,
    calls: Arc<Mutex<Vec<CheckCall>>>,
}

impl ScriptedChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `host` always reports `percent`
    pub fn with_usage(self, host: &str, percent: u8) -> Self {
        self.set_outcome(host, CheckOutcome::Usage(percent));
        self
    }

    /// `host` always fails with `reason`
    pub fn with_failure(self, host: &str, reason: &str) -> Self {
        self.set_outcome(host, CheckOutcome::Failed(reason.to_string()));
        self
    }

    pub fn set_outcome(&self, host: &str, outcome: CheckOutcome) {
        self.fixed.lock().unwrap().insert(host.to_string(), outcome);
    }

    /// Queue a one-shot outcome, used before the fixed one
    pub fn push_outcome(&self, host: &str, outcome: CheckOutcome) {
        self.queued
            .lock()
            .unwrap()
            .entry(host.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub fn calls(&self) -> Vec<CheckCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn checked_hosts(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.host).collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
        self.queued.lock().unwrap().clear();
    }
}

#[async_trait]
impl DiskChecker for ScriptedChecker {
    async fn check_disk_usage(&self, host: &str, timeout: Option<Duration>) -> CheckOutcome {
        tracing::debug!("🔎 [MOCK] Checking {}", host);
        self.calls.lock().unwrap().push(CheckCall {
            host: host.to_string(),
            timeout,
        });

        if let Some(outcome) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(host)
            .and_then(VecDeque::pop_front)
        {
            return outcome;
        }

        self.fixed
            .lock()
            .unwrap()
            .get(host)
            .cloned()
            .unwrap_or_else(|| CheckOutcome::Failed(format!("no scripted outcome for {}", host)))
    }
}
