//! # wattmarket-types
//!
//! Shared types, errors, and configuration for the **wattmarket** energy
//! ledger and offer lifecycle engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`ParticipantId`], [`OfferId`], [`TradeId`], [`TxRef`], [`BlockHeight`]
//! - **Offer model**: [`Offer`], [`OfferStatus`], [`OfferAction`], [`OfferView`]
//! - **Trade model**: [`Trade`]
//! - **Balance model**: [`ParticipantBalance`]
//! - **Event model**: [`LedgerEvent`]
//! - **Configuration**: [`MarketConfig`], [`SweepConfig`], [`ReconcilerConfig`]
//! - **Errors**: [`WattmarketError`] with `WM_ERR_` prefix codes
//! - **Clock**: [`Clock`], [`SystemClock`] (plus `ManualClock` behind `test-helpers`)

pub mod balance;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod offer;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use wattmarket_types::{Offer, OfferStatus, LedgerEvent, ...};

pub use balance::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use offer::*;
pub use trade::*;

// Constants are accessed via `wattmarket_types::constants::FOO`
// (not re-exported to avoid name collisions).
