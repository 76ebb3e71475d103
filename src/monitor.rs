// src/monitor.rs
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::aggregator;
use crate::console::{ConnectionStatus, ConsoleManager};

/// Re-enters `connecting`, probes the console and reports where it landed.
pub async fn refresh(console: &ConsoleManager) -> ConnectionStatus {
    console.begin_refresh();
    let status = aggregator::server_status(console).await;
    debug!("Refresh probe finished with source {:?}", status.source);
    console.status()
}

/// Periodic refresh task. Reconnection only ever happens through the probe's own request.
pub struct StatusPoller {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl StatusPoller {
    pub fn start(console: Arc<ConsoleManager>, every: Duration) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Status poller running every {:?}", every);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let status = refresh(&console).await;
                        debug!("Console state after poll: {:?}", status.state);
                    }
                }
            }
            info!("Status poller stopped");
        });

        Self { token, handle }
    }

    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            debug!("Status poller ended abnormally: {}", e);
        }
    }
}
