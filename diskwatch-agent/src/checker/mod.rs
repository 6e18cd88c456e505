//! Disk usage checks
//!
//! A checker turns a host name into a usage percentage. Failures are
//! reported as `CheckOutcome::Failed`, never raised, so one unreachable
//! host cannot stop a sweep.

mod ssh;

pub use ssh::{parse_usage, SshDiskChecker, DF_COMMAND};

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Percentage reported for a host whose check did not complete
pub const FAILURE_SENTINEL: i32 = -1;

/// Result of checking one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum CheckOutcome {
    Usage(u8),
    Failed(String),
}

impl CheckOutcome {
    /// Usage percentage, or `FAILURE_SENTINEL` for a failed check
    pub fn as_percent(&self) -> i32 {
        match self {
            CheckOutcome::Usage(percent) => i32::from(*percent),
            CheckOutcome::Failed(_) => FAILURE_SENTINEL,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CheckOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub host: String,
    pub outcome: CheckOutcome,
}

#[async_trait]
pub trait DiskChecker: Send + Sync {
    /// Check root filesystem usage on `host`. `timeout` of `None` leaves
    /// the limit to the transport.
    async fn check_disk_usage(&self, host: &str, timeout: Option<Duration>) -> CheckOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_maps_to_sentinel() {
        assert_eq!(CheckOutcome::Usage(85).as_percent(), 85);
        assert_eq!(CheckOutcome::Usage(0).as_percent(), 0);
        assert_eq!(
            CheckOutcome::Failed("connection refused".into()).as_percent(),
            FAILURE_SENTINEL
        );
        assert!(CheckOutcome::Failed(String::new()).is_failure());
        assert!(!CheckOutcome::Usage(10).is_failure());
    }

    #[test]
    fn test_outcome_serialization() {
        let result = CheckResult {
            host: "web1".into(),
            outcome: CheckOutcome::Usage(42),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["host"], "web1");
        assert_eq!(json["outcome"]["status"], "usage");
        assert_eq!(json["outcome"]["value"], 42);
    }
}
