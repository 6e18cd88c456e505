//! DiskWatch Agent - fleet disk usage monitor
//!
//! Loads `config.json` (or `$DISKWATCH_CONFIG`), then checks every host
//! on a fixed interval and alerts through the configured notifier until
//! interrupted with Ctrl-C.

use anyhow::{Context, Result};
use diskwatch_agent::config::{config_file_path, MonitorConfig};
use diskwatch_agent::{build_notifier, logging, DiskMonitor, Scheduler, SshDiskChecker};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Wired-up agent, ready to run
struct Agent {
    monitor: DiskMonitor,
    scheduler: Scheduler,
}

impl Agent {
    /// Build notifier, checker and monitor from the loaded configuration
    fn new(config: &MonitorConfig, shutdown: CancellationToken) -> Result<Self> {
        let notifier = build_notifier(config).with_context(|| {
            format!(
                "Failed to set up '{}' notifier",
                config.notification_type.as_str()
            )
        })?;
        let checker = Arc::new(SshDiskChecker::new(config.ssh.clone()));

        let monitor = DiskMonitor::new(config.servers.clone(), config.threshold, checker, notifier)
            .with_check_timeout(config.check_timeout_duration())
            .with_failure_alerts(config.alert_on_failure);

        if monitor.servers().is_empty() {
            warn!("No servers configured, sweeps will be empty");
        }

        Ok(Agent {
            monitor,
            scheduler: Scheduler::new(config.interval_duration(), shutdown),
        })
    }

    async fn run(&self) -> u64 {
        info!(
            "Starting disk monitor: {} host(s), threshold {}%",
            self.monitor.servers().len(),
            self.monitor.threshold()
        );
        self.scheduler.run(&self.monitor).await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config_path = config_file_path();
    let config = MonitorConfig::load(Some(&config_path))
        .await
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    logging::init(config.log_level)?;
    debug!("Configuration:\n{}", config);

    let shutdown = CancellationToken::new();
    let agent = Agent::new(&config, shutdown.clone())?;

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C, shutting down"),
            Err(e) => {
                error!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
        }
        shutdown.cancel();
    });

    let ticks = agent.run().await;
    info!("Disk monitor stopped after {} sweep(s)", ticks);
    Ok(())
}
