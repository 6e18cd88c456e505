//! DiskWatch agent library
//!
//! Polls a fleet of hosts for root filesystem usage and raises alerts
//! through a webhook or mail notifier:
//! - `checker`: per-host disk usage over SSH
//! - `notifier`: webhook and SMTP delivery
//! - `monitor`: one sequential sweep of the fleet
//! - `scheduler`: the cancellable poll loop
//! - `config` / `logging`: startup plumbing

pub mod checker;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notifier;
pub mod scheduler;

pub use checker::{CheckOutcome, CheckResult, DiskChecker, SshDiskChecker, FAILURE_SENTINEL};
pub use config::MonitorConfig;
pub use error::{CheckError, ConfigError, NotifyError};
pub use monitor::{DiskMonitor, TickReport};
pub use notifier::{build_notifier, Notifier};
pub use scheduler::Scheduler;
