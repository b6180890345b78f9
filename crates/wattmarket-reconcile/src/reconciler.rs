//! The chain event reconciler.
//!
//! One loop drains the backlog between the durable cursor and the chain tip
//! in bounded chunks, then keeps polling the tip. Every event is applied to
//! the market keyed by its transaction reference, so redelivery after a
//! crash (cursor persisted before the crash, events reprocessed after) is
//! benign.
//!
//! # Failure handling
//!
//! - Upstream query failures are retried with bounded exponential backoff;
//!   when retries are exhausted the pass ends and the next tick starts over
//!   from the persisted cursor.
//! - A duplicate event is counted and passed over.
//! - Any other per-event failure at the chunk's highest block pins the
//!   cursor just below that block, so the whole block is retried next pass.
//!   Failures at older blocks are logged and passed over; holding the
//!   cursor back for them would replay every later block forever.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use wattmarket_engine::SharedMarket;
use wattmarket_types::{BlockHeight, Clock, LedgerEvent, ReconcilerConfig, Result};

use crate::cursor::{CursorStore, IndexerCursor};
use crate::source::LedgerSource;

/// Outcome of one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilerReport {
    /// Range queries issued.
    pub chunks: usize,
    /// Events fetched.
    pub events: usize,
    /// Events applied to the market.
    pub applied: usize,
    /// Events whose transaction reference was already applied.
    pub duplicates: usize,
    /// Events behind the frontier that failed and were passed over.
    pub skipped: usize,
}

/// Consumes external ledger events and applies them to the market.
pub struct ChainEventReconciler<S, C> {
    market: SharedMarket,
    clock: Arc<dyn Clock>,
    source: S,
    store: C,
    config: ReconcilerConfig,
}

impl<S, C> ChainEventReconciler<S, C>
where
    S: LedgerSource,
    C: CursorStore,
{
    #[must_use]
    pub fn new(
        market: SharedMarket,
        clock: Arc<dyn Clock>,
        source: S,
        store: C,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            market,
            clock,
            source,
            store,
            config,
        }
    }

    /// Run one full reconcile pass: fetch the chain tip, then work the
    /// cursor up to it in chunks, persisting the cursor after each chunk.
    pub async fn catch_up(&self) -> Result<ReconcilerReport> {
        let mut report = ReconcilerReport::default();
        let latest = self
            .with_retry("latest-block", || self.source.latest_block())
            .await?;
        let mut cursor = self.load_cursor().await?;

        while cursor.last_processed_block < latest {
            let from = cursor.last_processed_block.next();
            let span = self.config.chunk_blocks.max(1);
            let to = BlockHeight((from.0 + span - 1).min(latest.0));

            let events = self
                .with_retry("events-in-range", || self.source.events_in_range(from, to))
                .await?;
            report.chunks += 1;
            report.events += events.len();

            let advance_to = self.apply_chunk(&events, to, &mut report).await;
            if cursor.advance_to(advance_to) {
                self.store.save(&cursor).await?;
            }
            if advance_to < to {
                // Frontier failure: leave the rest of the backlog for the
                // next pass so the pinned block is retried, not hammered.
                break;
            }
        }
        Ok(report)
    }

    /// Spawn the reconcile loop: one immediate backlog drain, then a live
    /// poll of the chain tip.
    #[must_use]
    pub fn start(self) -> ReconcilerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            match self.catch_up().await {
                Ok(report) => tracing::info!(
                    events = report.events,
                    applied = report.applied,
                    duplicates = report.duplicates,
                    "Backlog drained"
                ),
                Err(e) => tracing::error!(error = %e, "Backlog drain failed"),
            }

            let mut ticker = tokio::time::interval(self.config.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.catch_up().await {
                            tracing::error!(error = %e, "Reconcile pass failed");
                        }
                    }
                    _ = stop_rx.changed() => {
                        tracing::info!("Reconciler stopping");
                        break;
                    }
                }
            }
        });
        tracing::info!("Chain event reconciler started");
        ReconcilerHandle {
            stop: stop_tx,
            task,
        }
    }

    /// Apply one chunk's events. Returns the block the cursor may advance
    /// to: the chunk end normally, or just below the frontier when the
    /// frontier block failed.
    async fn apply_chunk(
        &self,
        events: &[LedgerEvent],
        chunk_end: BlockHeight,
        report: &mut ReconcilerReport,
    ) -> BlockHeight {
        let frontier = events
            .iter()
            .map(LedgerEvent::block_height)
            .max()
            .unwrap_or(chunk_end);
        let now = self.clock.now();
        let mut market = self.market.lock().await;

        for event in events {
            match market.apply_event(event, now) {
                Ok(_) => report.applied += 1,
                Err(e) if e.is_benign() => {
                    report.duplicates += 1;
                    tracing::debug!(tx = %event.tx_ref(), "Event already applied");
                }
                Err(e) => {
                    let block = event.block_height();
                    if block == frontier {
                        tracing::warn!(
                            kind = event.kind(),
                            tx = %event.tx_ref(),
                            block = %block,
                            error = %e,
                            "Event failed at the chunk frontier; retrying next pass"
                        );
                        return frontier.prev();
                    }
                    report.skipped += 1;
                    tracing::warn!(
                        kind = event.kind(),
                        tx = %event.tx_ref(),
                        block = %block,
                        error = %e,
                        "Event failed behind the frontier; passed over"
                    );
                }
            }
        }
        chunk_end
    }

    async fn load_cursor(&self) -> Result<IndexerCursor> {
        Ok(self
            .store
            .load(&self.config.service_name)
            .await?
            .unwrap_or_else(|| IndexerCursor::new(self.config.service_name.clone())))
    }

    /// Retry a transient upstream failure with exponential backoff. Caller
    /// errors and exhausted retries are surfaced as-is.
    async fn with_retry<T, Fut>(
        &self,
        what: &'static str,
        mut op: impl FnMut() -> Fut,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_base * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    tracing::warn!(
                        what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Upstream call failed; backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Handle to a running reconciler. Dropping it without calling
/// [`stop`](ReconcilerHandle::stop) detaches the loop.
pub struct ReconcilerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// Signal the loop to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
        tracing::info!("Chain event reconciler stopped");
    }
}
