//! Periodic rate refresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::refresh::RateRefresher;

/// Drives [`RateRefresher`] on a fixed period until shutdown is signalled.
///
/// The first cycle runs immediately. Failures are logged and the loop keeps
/// going; the last good snapshot stays in the store.
pub struct RefreshScheduler {
    refresher: Arc<RateRefresher>,
    interval: Duration,
}

impl RefreshScheduler {
    /// Create a scheduler.
    pub fn new(refresher: Arc<RateRefresher>, interval: Duration) -> Self {
        Self {
            refresher,
            interval,
        }
    }

    /// Spawn the loop onto the runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Run until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "Rate refresh scheduler started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.refresher.refresh().await {
                Ok(report) => info!(
                    cycle_id = %report.cycle_id,
                    rates = report.rates_written,
                    "Scheduled refresh succeeded"
                ),
                Err(e) => warn!(
                    error = %e,
                    "Scheduled refresh failed, keeping previous snapshot"
                ),
            }

            if self.wait_for_next_cycle(&mut shutdown).await {
                break;
            }
        }

        info!("Rate refresh scheduler stopped");
    }

    /// Sleep one period. Returns `true` if shutdown was signalled meanwhile.
    async fn wait_for_next_cycle(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let sleep = tokio::time::sleep(self.interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return true;
                    }
                }
            }
        }
    }
}
