//! # wattmarket-engine
//!
//! **Lifecycle Plane**: balance accounting, the offer state machine, and the
//! caller-facing lifecycle service.
//!
//! ## Architecture
//!
//! 1. **BalanceLedger**: per-participant generated/sold/reserved accounting —
//!    the enforcement point for the non-oversell invariant
//! 2. **OfferBook**: offer store; every status change is a compare-and-swap
//!    on the current status
//! 3. **TradeLog**: completed-sale records keyed by ledger tx reference
//! 4. **Market**: the aggregate — a transition and its ledger adjustment
//!    commit as one unit of work
//! 5. **LifecycleService**: async façade serializing all writers through one
//!    lock around the Market
//!
//! ## Offer flow
//!
//! ```text
//! caller → BalanceLedger.reserve() → OfferBook.insert() → Active
//!        → [sweep]  Active → Expired → Deleted
//!        → [event]  Active → Sold (settle) | Active/Expired → Deleted (release)
//!        → [caller] Expired → Active (restore) | Active → Deleted (cancel)
//! ```

pub mod balance_ledger;
pub mod lifecycle;
pub mod market;
pub mod offer_book;
pub mod trade_log;

pub use balance_ledger::BalanceLedger;
pub use lifecycle::{LifecycleService, SharedMarket};
pub use market::{AppliedEvent, CreateOffer, EditOffer, Market, SweepReport};
pub use offer_book::OfferBook;
pub use trade_log::TradeLog;
