//! Offer types for the wattmarket lifecycle engine.
//!
//! An offer moves through a closed state machine: `Active` → `Expired` (by
//! time), `Active` → `Sold` (by a verified purchase event), `Active`/`Expired`
//! → `Deleted` (by cancel or the delete sweep), and `Expired` → `Active`
//! (restore, while the deletion window is still open). `Sold` and `Deleted`
//! are terminal. Cancellation is a flag that decorates `Deleted`, not a
//! separate status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OfferId, ParticipantId, TxRef};

/// Lifecycle status of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OfferStatus {
    Active,
    Expired,
    Sold,
    Deleted,
}

impl OfferStatus {
    /// `Sold` and `Deleted` have no outgoing transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sold | Self::Deleted)
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Sold => write!(f, "SOLD"),
            Self::Deleted => write!(f, "DELETED"),
        }
    }
}

/// Caller-facing actions that may currently be taken on an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfferAction {
    Edit,
    Cancel,
    Restore,
}

impl std::fmt::Display for OfferAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Edit => write!(f, "EDIT"),
            Self::Cancel => write!(f, "CANCEL"),
            Self::Restore => write!(f, "RESTORE"),
        }
    }
}

/// A sell listing for a quantity of generated energy.
///
/// Offers are never physically removed — `Deleted` is a terminal logical
/// status, so the full history stays queryable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    /// Unique id, assigned by the external ledger.
    pub id: OfferId,
    pub seller: ParticipantId,
    /// Quantity on offer (kWh). While the offer is Active or Expired this
    /// amount is reserved against the seller's balance.
    pub quantity: Decimal,
    /// Price per kWh in the market token denomination.
    pub price_token: Decimal,
    /// Price per kWh in the fiat display denomination.
    pub price_fiat: Decimal,
    pub status: OfferStatus,
    /// Set when the offer reached `Deleted` through a cancellation rather
    /// than the auto-delete sweep.
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
    /// When the offer stops being purchasable (Active → Expired boundary).
    pub expires_at: DateTime<Utc>,
    /// When the delete sweep may finalize the offer.
    pub auto_delete_at: DateTime<Utc>,
    pub restore_count: u32,
    pub edit_count: u32,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<ParticipantId>,
    /// Buyer, set on the Active → Sold transition.
    pub buyer: Option<ParticipantId>,
    /// Ledger transaction that created the offer, if known.
    pub create_tx_ref: Option<TxRef>,
    /// Ledger transaction that completed the sale. Its uniqueness is the
    /// idempotency key for purchase events.
    pub complete_tx_ref: Option<TxRef>,
}

impl Offer {
    /// Whether the offer is Active but past its expiry instant (the expire
    /// sweep has not caught up yet).
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == OfferStatus::Active && now >= self.expires_at
    }

    /// Whether the offer can still be edited: Active and unexpired.
    #[must_use]
    pub fn is_editable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == OfferStatus::Active && now < self.expires_at
    }

    /// Whether a restore is currently possible: Expired, deletion window open.
    #[must_use]
    pub fn is_restorable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == OfferStatus::Expired && now < self.auto_delete_at
    }

    /// Whole days until expiry, rounded up, never negative.
    #[must_use]
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        days_until(now, self.expires_at)
    }

    /// Whole days until auto-deletion, rounded up, never negative.
    #[must_use]
    pub fn days_until_deletion(&self, now: DateTime<Utc>) -> i64 {
        days_until(now, self.auto_delete_at)
    }

    /// The set of actions a caller may take on this offer right now.
    #[must_use]
    pub fn allowed_actions(&self, now: DateTime<Utc>) -> Vec<OfferAction> {
        match self.status {
            OfferStatus::Active if now < self.expires_at => {
                vec![OfferAction::Edit, OfferAction::Cancel]
            }
            // Past expiry but not yet swept: still cancellable, no longer editable.
            OfferStatus::Active => vec![OfferAction::Cancel],
            OfferStatus::Expired if now < self.auto_delete_at => vec![OfferAction::Restore],
            OfferStatus::Expired | OfferStatus::Sold | OfferStatus::Deleted => Vec::new(),
        }
    }
}

fn days_until(now: DateTime<Utc>, target: DateTime<Utc>) -> i64 {
    let secs = (target - now).num_seconds();
    if secs <= 0 {
        0
    } else {
        (secs + 86_399) / 86_400
    }
}

impl std::fmt::Display for Offer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Offer[{}] {} {} kWh @ {} by {}",
            self.id, self.status, self.quantity, self.price_token, self.seller,
        )
    }
}

/// Caller-facing projection: the offer plus its computed fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferView {
    pub offer: Offer,
    pub days_until_expiry: i64,
    pub days_until_deletion: i64,
    pub allowed_actions: Vec<OfferAction>,
}

impl OfferView {
    /// Project an offer at the given instant.
    #[must_use]
    pub fn at(offer: Offer, now: DateTime<Utc>) -> Self {
        let days_until_expiry = offer.days_until_expiry(now);
        let days_until_deletion = offer.days_until_deletion(now);
        let allowed_actions = offer.allowed_actions(now);
        Self {
            offer,
            days_until_expiry,
            days_until_deletion,
            allowed_actions,
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Offer {
    /// An Active offer created at `now` with the default 7/10 day windows.
    #[must_use]
    pub fn dummy_active(id: OfferId, seller: ParticipantId, qty: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            id,
            seller,
            quantity: qty,
            price_token: Decimal::new(12, 2),
            price_fiat: Decimal::new(15, 2),
            status: OfferStatus::Active,
            cancelled: false,
            created_at: now,
            expires_at: now + chrono::Duration::days(crate::constants::DEFAULT_EXPIRY_DAYS),
            auto_delete_at: now
                + chrono::Duration::days(crate::constants::DEFAULT_DELETE_AFTER_CREATE_DAYS),
            restore_count: 0,
            edit_count: 0,
            cancelled_at: None,
            cancelled_by: None,
            buyer: None,
            create_tx_ref: None,
            complete_tx_ref: None,
        }
    }
}
