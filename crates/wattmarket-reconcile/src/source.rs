//! The ledger source: read-only access to the external energy ledger.
//!
//! The reconciler only needs two questions answered: how far the chain has
//! advanced, and which events landed in a given block range. Events come
//! back sorted by block height; the upstream enforces a maximum span per
//! range query, which the reconciler honors via its chunk size.

use std::future::Future;

use wattmarket_types::{BlockHeight, LedgerEvent, Result};

/// Read-only view of the external ledger's event stream.
pub trait LedgerSource: Send + Sync + 'static {
    /// Height of the newest block on the ledger.
    fn latest_block(&self) -> impl Future<Output = Result<BlockHeight>> + Send;

    /// All events in blocks `from..=to`, sorted by block height.
    ///
    /// Fails with `UpstreamUnavailable` when the ledger cannot be queried;
    /// the caller retries with backoff.
    fn events_in_range(
        &self,
        from: BlockHeight,
        to: BlockHeight,
    ) -> impl Future<Output = Result<Vec<LedgerEvent>>> + Send;
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
pub use mock::MockLedgerSource;

#[cfg(any(test, feature = "test-helpers"))]
mod mock {
    use std::sync::{Arc, Mutex, PoisonError};

    use wattmarket_types::{BlockHeight, LedgerEvent, Result, WattmarketError};

    use super::LedgerSource;

    #[derive(Default)]
    struct MockState {
        latest: BlockHeight,
        events: Vec<LedgerEvent>,
        failures_remaining: u32,
        range_queries: u32,
    }

    /// Scripted in-memory ledger for tests. Push events to grow the chain,
    /// inject upstream failures, and count range queries to assert chunking.
    #[derive(Clone, Default)]
    pub struct MockLedgerSource {
        state: Arc<Mutex<MockState>>,
    }

    impl MockLedgerSource {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Append an event; the chain tip grows to its block if needed.
        pub fn push_event(&self, event: LedgerEvent) {
            let mut state = self.lock();
            state.latest = state.latest.max(event.block_height());
            state.events.push(event);
            state.events.sort_by_key(LedgerEvent::block_height);
        }

        /// Advance the chain tip without emitting events (empty blocks).
        pub fn set_latest(&self, latest: BlockHeight) {
            let mut state = self.lock();
            state.latest = state.latest.max(latest);
        }

        /// Make the next `n` calls fail with `UpstreamUnavailable`.
        pub fn fail_next_calls(&self, n: u32) {
            self.lock().failures_remaining = n;
        }

        /// How many range queries have been issued so far.
        #[must_use]
        pub fn range_queries(&self) -> u32 {
            self.lock().range_queries
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        fn check_failure(state: &mut MockState) -> Result<()> {
            if state.failures_remaining > 0 {
                state.failures_remaining -= 1;
                return Err(WattmarketError::UpstreamUnavailable {
                    reason: "injected".into(),
                });
            }
            Ok(())
        }
    }

    impl LedgerSource for MockLedgerSource {
        async fn latest_block(&self) -> Result<BlockHeight> {
            let mut state = self.lock();
            Self::check_failure(&mut state)?;
            Ok(state.latest)
        }

        async fn events_in_range(
            &self,
            from: BlockHeight,
            to: BlockHeight,
        ) -> Result<Vec<LedgerEvent>> {
            let mut state = self.lock();
            Self::check_failure(&mut state)?;
            state.range_queries += 1;
            Ok(state
                .events
                .iter()
                .filter(|e| {
                    let b = e.block_height();
                    from <= b && b <= to
                })
                .cloned()
                .collect())
        }
    }
}
