//! Trade record log keyed by ledger transaction reference.
//!
//! Each verified purchase is recorded exactly once; recording the same
//! transaction reference a second time returns
//! [`WattmarketError::DuplicateEvent`]. Trades are permanent records, not a
//! cache, so the log is unbounded.

use std::collections::HashMap;

use wattmarket_types::{OfferId, Result, Trade, TxRef, WattmarketError};

/// Append-only log of completed trades.
pub struct TradeLog {
    /// Trades indexed by their unique transaction reference.
    trades: HashMap<TxRef, Trade>,
    /// Insertion order, oldest first.
    order: Vec<TxRef>,
}

impl TradeLog {
    /// Create a new empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trades: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Record a trade.
    ///
    /// # Errors
    /// Returns [`WattmarketError::DuplicateEvent`] if a trade with this
    /// transaction reference was already recorded.
    pub fn record(&mut self, trade: Trade) -> Result<()> {
        if self.trades.contains_key(&trade.tx_ref) {
            return Err(WattmarketError::DuplicateEvent(trade.tx_ref.clone()));
        }
        self.order.push(trade.tx_ref.clone());
        self.trades.insert(trade.tx_ref.clone(), trade);
        Ok(())
    }

    /// Whether a transaction reference has already produced a trade.
    #[must_use]
    pub fn contains(&self, tx_ref: &TxRef) -> bool {
        self.trades.contains_key(tx_ref)
    }

    /// Look up a trade by transaction reference.
    #[must_use]
    pub fn get(&self, tx_ref: &TxRef) -> Option<&Trade> {
        self.trades.get(tx_ref)
    }

    /// All trades for a given offer, oldest first.
    #[must_use]
    pub fn by_offer(&self, offer_id: OfferId) -> Vec<&Trade> {
        self.order
            .iter()
            .filter_map(|tx| self.trades.get(tx))
            .filter(|t| t.offer_id == offer_id)
            .collect()
    }

    /// Number of trades recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

impl Default for TradeLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use wattmarket_types::{BlockHeight, ParticipantId, TradeId};

    fn make_trade(offer: u64, tx: &str) -> Trade {
        Trade {
            id: TradeId::new(),
            offer_id: OfferId(offer),
            buyer: ParticipantId::random(),
            seller: ParticipantId::random(),
            quantity: Decimal::new(40, 0),
            price_token: Decimal::new(12, 2),
            block_height: BlockHeight(100),
            tx_ref: TxRef::new(tx),
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn first_record_ok() {
        let mut log = TradeLog::new();
        log.record(make_trade(1, "0xaaa")).unwrap();
        assert!(log.contains(&TxRef::new("0xaaa")));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn duplicate_tx_ref_blocked() {
        let mut log = TradeLog::new();
        log.record(make_trade(1, "0xaaa")).unwrap();

        let err = log.record(make_trade(2, "0xaaa")).unwrap_err();
        assert!(
            matches!(err, WattmarketError::DuplicateEvent(ref tx) if tx == &TxRef::new("0xaaa")),
            "Expected DuplicateEvent, got: {err:?}"
        );
        assert_eq!(log.len(), 1);
        // The original record wins.
        assert_eq!(log.get(&TxRef::new("0xaaa")).unwrap().offer_id, OfferId(1));
    }

    #[test]
    fn by_offer_preserves_order() {
        let mut log = TradeLog::new();
        log.record(make_trade(1, "0xaaa")).unwrap();
        log.record(make_trade(2, "0xbbb")).unwrap();
        log.record(make_trade(1, "0xccc")).unwrap();

        let trades = log.by_offer(OfferId(1));
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].tx_ref, TxRef::new("0xaaa"));
        assert_eq!(trades[1].tx_ref, TxRef::new("0xccc"));
    }

    #[test]
    fn empty_log() {
        let log = TradeLog::new();
        assert!(log.is_empty());
        assert!(!log.contains(&TxRef::new("0xaaa")));
        assert!(log.by_offer(OfferId(1)).is_empty());
    }
}
