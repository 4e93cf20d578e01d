// src/core/tasks/ping_pruner.rs

use crate::core::service::GatewayHandle;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// How often expired latency probes are swept.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// A task that periodically asks the gateway to drop latency probes that
/// never got a pong. Ticks missed while the runtime was busy are skipped,
/// not replayed.
pub struct PingPrunerTask {
    gateway: GatewayHandle,
    period: Duration,
}

impl PingPrunerTask {
    pub fn new(gateway: GatewayHandle) -> Self {
        Self::with_period(gateway, PRUNE_INTERVAL)
    }

    pub fn with_period(gateway: GatewayHandle, period: Duration) -> Self {
        Self { gateway, period }
    }

    /// Runs the main loop for the pruner.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Latency probe pruner started. Interval: {:?}.", self.period);
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    debug!("Pruning expired latency probes.");
                    if self.gateway.prune().is_err() {
                        warn!("Gateway stopped, latency probe pruner exiting.");
                        return;
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Latency probe pruner shutting down.");
                    return;
                }
            }
        }
    }
}
