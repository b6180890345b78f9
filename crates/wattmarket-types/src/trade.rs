//! Trade records produced by chain reconciliation.
//!
//! A [`Trade`] is the immutable local record of a purchase the external
//! ledger has already executed. It is created exactly once per verified
//! purchase event; the event's transaction reference is the uniqueness key.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BlockHeight, OfferId, ParticipantId, TradeId, TxRef};

/// An immutable record of a completed sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Internal record id (UUIDv7, time-ordered).
    pub id: TradeId,
    /// The offer that was sold.
    pub offer_id: OfferId,
    pub buyer: ParticipantId,
    pub seller: ParticipantId,
    /// Executed quantity (kWh).
    pub quantity: Decimal,
    /// Price per kWh in the token denomination at execution.
    pub price_token: Decimal,
    /// Block in which the external ledger executed the purchase.
    pub block_height: BlockHeight,
    /// Unique ledger transaction reference (idempotency key).
    pub tx_ref: TxRef,
    /// When the trade was recorded locally.
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// Total token value of the trade (price × quantity).
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.price_token * self.quantity
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}] {} {} kWh @ {} ({})",
            self.id, self.offer_id, self.quantity, self.price_token, self.tx_ref,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trade() -> Trade {
        Trade {
            id: TradeId::new(),
            offer_id: OfferId(7),
            buyer: ParticipantId::random(),
            seller: ParticipantId::random(),
            quantity: Decimal::new(40, 0),
            price_token: Decimal::new(12, 2),
            block_height: BlockHeight(100),
            tx_ref: TxRef::new("0xabc123"),
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn trade_notional() {
        let t = make_trade();
        assert_eq!(t.notional(), Decimal::new(480, 2)); // 40 × 0.12
    }

    #[test]
    fn trade_display() {
        let t = make_trade();
        let s = format!("{t}");
        assert!(s.contains("offer:7"));
        assert!(s.contains("tx:0xabc123"));
    }

    #[test]
    fn trade_serde_roundtrip() {
        let trade = make_trade();
        let json = serde_json::to_string(&trade).unwrap();
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade.id, back.id);
        assert_eq!(trade.tx_ref, back.tx_ref);
        assert_eq!(trade.quantity, back.quantity);
    }
}
