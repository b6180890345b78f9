//! The indexer cursor: durable progress through the external ledger.
//!
//! The cursor records the highest block whose events have all been applied.
//! On restart the reconciler resumes from the block after it, so every event
//! at or below the cursor is guaranteed applied and every event above it will
//! be (re)delivered. Re-delivery is safe because event application is keyed
//! by transaction reference.
//!
//! # Invariants
//!
//! - **Forward-only**: the cursor never moves backwards. An attempt to set it
//!   to a block at or below its current position is a no-op.
//! - **Advance after apply**: the cursor is persisted only once every event
//!   up to the new position has been applied (or deliberately passed over).
//!   A crash between apply and persist replays events, never loses them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use wattmarket_types::{BlockHeight, Result};

/// Progress marker for one named consumer of the external ledger.
///
/// Several consumers can index the same ledger independently; each keys its
/// cursor by `service_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerCursor {
    pub service_name: String,
    /// Highest block whose events have all been applied.
    pub last_processed_block: BlockHeight,
}

impl IndexerCursor {
    /// Fresh cursor at height zero: the first pass backfills from block 1.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            last_processed_block: BlockHeight(0),
        }
    }

    /// Move the cursor forward. Returns `false` (and leaves the cursor
    /// untouched) if `block` is not strictly ahead of the current position.
    pub fn advance_to(&mut self, block: BlockHeight) -> bool {
        if block > self.last_processed_block {
            self.last_processed_block = block;
            true
        } else {
            false
        }
    }
}

/// Durable storage for indexer cursors.
pub trait CursorStore: Send + Sync + 'static {
    /// Load the cursor for a named consumer, if one was ever saved.
    fn load(
        &self,
        service_name: &str,
    ) -> impl Future<Output = Result<Option<IndexerCursor>>> + Send;

    /// Persist a cursor, overwriting any previous position for its service.
    fn save(&self, cursor: &IndexerCursor) -> impl Future<Output = Result<()>> + Send;
}

/// In-memory cursor store. Progress does not survive a restart, so a process
/// using it re-indexes from block 1 on startup; duplicate suppression makes
/// that correct, if slow.
#[derive(Debug, Clone, Default)]
pub struct MemoryCursorStore {
    cursors: Arc<Mutex<HashMap<String, IndexerCursor>>>,
}

impl MemoryCursorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored cursor, for assertions in tests.
    #[must_use]
    pub fn get(&self, service_name: &str) -> Option<IndexerCursor> {
        self.cursors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service_name)
            .cloned()
    }
}

impl CursorStore for MemoryCursorStore {
    async fn load(&self, service_name: &str) -> Result<Option<IndexerCursor>> {
        Ok(self
            .cursors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service_name)
            .cloned())
    }

    async fn save(&self, cursor: &IndexerCursor) -> Result<()> {
        self.cursors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cursor.service_name.clone(), cursor.clone());
        Ok(())
    }
}
