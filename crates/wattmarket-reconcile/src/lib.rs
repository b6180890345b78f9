//! # wattmarket-reconcile
//!
//! **Reconciliation Plane**: consumes the external energy ledger's event
//! stream and applies completed sales and cancellations to the market.
//!
//! ## Architecture
//!
//! 1. **IndexerCursor**: durable, forward-only progress marker; persisted
//!    through a [`CursorStore`]
//! 2. **LedgerSource**: read-only view of the chain tip and block-range
//!    event queries
//! 3. **ChainEventReconciler**: drains the backlog between cursor and tip
//!    in bounded chunks, then polls live
//!
//! ## Delivery guarantee
//!
//! At-least-once delivery with idempotent application. The cursor advances
//! only after a chunk's events are applied; a crash in between replays the
//! chunk, and the market's transaction-reference keying turns replays into
//! benign duplicates.

pub mod cursor;
pub mod reconciler;
pub mod source;

pub use cursor::{CursorStore, IndexerCursor, MemoryCursorStore};
pub use reconciler::{ChainEventReconciler, ReconcilerHandle, ReconcilerReport};
pub use source::LedgerSource;

#[cfg(any(test, feature = "test-helpers"))]
pub use source::MockLedgerSource;
