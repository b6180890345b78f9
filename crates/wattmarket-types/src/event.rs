//! Events consumed from the external energy ledger.
//!
//! The ledger is append-only and block-ordered; it is the ultimate source of
//! truth for completed sales and cancellations. The engine never writes to
//! it. Offer-creation events are informational only (creation is handled
//! synchronously by the lifecycle service) and are not modeled here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BlockHeight, OfferId, ParticipantId, TxRef};

/// An event emitted by the external ledger, delivered in non-decreasing
/// block order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A buyer completed the purchase of an offer on-chain.
    PurchaseCompleted {
        offer_id: OfferId,
        buyer: ParticipantId,
        seller: ParticipantId,
        quantity: Decimal,
        price_token: Decimal,
        block_height: BlockHeight,
        tx_ref: TxRef,
    },
    /// An offer was cancelled on-chain.
    OfferCancelled {
        offer_id: OfferId,
        cancelled_by: ParticipantId,
        seller: ParticipantId,
        quantity: Decimal,
        price_token: Decimal,
        block_height: BlockHeight,
        tx_ref: TxRef,
    },
}

impl LedgerEvent {
    #[must_use]
    pub fn offer_id(&self) -> OfferId {
        match self {
            Self::PurchaseCompleted { offer_id, .. } | Self::OfferCancelled { offer_id, .. } => {
                *offer_id
            }
        }
    }

    #[must_use]
    pub fn block_height(&self) -> BlockHeight {
        match self {
            Self::PurchaseCompleted { block_height, .. }
            | Self::OfferCancelled { block_height, .. } => *block_height,
        }
    }

    #[must_use]
    pub fn tx_ref(&self) -> &TxRef {
        match self {
            Self::PurchaseCompleted { tx_ref, .. } | Self::OfferCancelled { tx_ref, .. } => tx_ref,
        }
    }

    /// Short kind tag for log lines.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PurchaseCompleted { .. } => "purchase-completed",
            Self::OfferCancelled { .. } => "offer-cancelled",
        }
    }
}
