//! The expiration scheduler: two independent sweep loops.
//!
//! The expire sweep (hourly by default) flips overdue Active offers to
//! Expired; the delete sweep (every 6 hours by default) finalizes Expired
//! offers whose deletion window has passed. Both are idempotent by
//! construction — the per-row status guard means re-running against
//! already-transitioned offers matches nothing.
//!
//! The scheduler is an explicit object with `start`/`stop` lifecycle and an
//! injectable clock, so tests can time-travel deterministically instead of
//! poking a global "is it running" flag.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use wattmarket_engine::SharedMarket;
use wattmarket_types::{Clock, SweepConfig};

/// Periodic sweeper applying time-based offer transitions.
pub struct ExpirationScheduler {
    market: SharedMarket,
    clock: Arc<dyn Clock>,
    config: SweepConfig,
}

impl ExpirationScheduler {
    #[must_use]
    pub fn new(market: SharedMarket, clock: Arc<dyn Clock>, config: SweepConfig) -> Self {
        Self {
            market,
            clock,
            config,
        }
    }

    /// Spawn both sweep loops. Each loop ticks on its own cadence; the first
    /// tick fires immediately so a restarted process catches up right away.
    #[must_use]
    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);

        let expire_task = spawn_sweep_loop(
            "expire",
            Arc::clone(&self.market),
            Arc::clone(&self.clock),
            self.config.expire_interval,
            stop_rx.clone(),
            |market, now| market.expire_sweep(now),
        );
        let delete_task = spawn_sweep_loop(
            "delete",
            self.market,
            self.clock,
            self.config.delete_interval,
            stop_rx,
            |market, now| market.delete_sweep(now),
        );

        tracing::info!("Expiration scheduler started");
        SchedulerHandle {
            stop: stop_tx,
            tasks: vec![expire_task, delete_task],
        }
    }
}

fn spawn_sweep_loop(
    name: &'static str,
    market: SharedMarket,
    clock: Arc<dyn Clock>,
    interval: std::time::Duration,
    mut stop: watch::Receiver<bool>,
    sweep: impl Fn(&mut wattmarket_engine::Market, chrono::DateTime<chrono::Utc>) -> wattmarket_engine::SweepReport
    + Send
    + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = clock.now();
                    let report = {
                        let mut market = market.lock().await;
                        sweep(&mut market, now)
                    };
                    if report.transitioned > 0 || report.failed > 0 {
                        tracing::debug!(
                            sweep = name,
                            transitioned = report.transitioned,
                            failed = report.failed,
                            "Sweep tick"
                        );
                    }
                }
                _ = stop.changed() => {
                    tracing::info!(sweep = name, "Sweep loop stopping");
                    break;
                }
            }
        }
    })
}

/// Handle to a running scheduler. Dropping it without calling
/// [`stop`](SchedulerHandle::stop) detaches the loops.
pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signal both loops to stop and wait for them to exit. In-flight
    /// sweeps finish; no new ticks are scheduled.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
        tracing::info!("Expiration scheduler stopped");
    }
}
