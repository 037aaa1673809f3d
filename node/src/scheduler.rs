//! Background loops.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use swapdesk_fx::RateUpdater;
use swapdesk_orders::OrderLifecycleManager;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Running background loops and their shutdown signal.
pub struct BackgroundTasks {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundTasks {
    /// Start the rate refresh and expiry sweep loops.
    pub fn spawn(
        updater: Arc<RateUpdater>,
        orders: Arc<OrderLifecycleManager>,
        sweep_interval: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let refresh = {
            let shutdown = shutdown_rx.clone();
            tokio::spawn(async move { updater.run(shutdown).await })
        };
        let sweep = tokio::spawn(run_expiry_sweep(orders, sweep_interval, shutdown_rx));

        info!("Background tasks started");
        Self {
            shutdown_tx,
            handles: vec![("rate_refresh", refresh), ("expiry_sweep", sweep)],
        }
    }

    /// Signal every loop and wait for it to finish its current iteration.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);

        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                error!(task = name, error = %e, "Background task panicked");
            }
        }

        info!("Background tasks stopped");
    }
}

/// Expire overdue orders on every tick until `shutdown` flips to `true`.
pub async fn run_expiry_sweep(
    orders: Arc<OrderLifecycleManager>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = orders.sweep_expired(Utc::now()).await {
                    warn!(error = %e, "Expiry sweep failed");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Expiry sweeper stopped");
}
