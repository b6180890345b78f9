//! The market aggregate: offers, balances, and trades mutated as one unit.
//!
//! Every operation takes `&mut self`, so a status transition and its ledger
//! adjustment commit together or not at all. Callers that need shared access
//! wrap the aggregate in a lock (see [`LifecycleService`](crate::LifecycleService));
//! the aggregate itself stays synchronous and deterministic.
//!
//! Time enters exclusively through `now` parameters — the aggregate never
//! reads the wall clock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use wattmarket_types::{
    LedgerEvent, MarketConfig, Offer, OfferId, OfferStatus, ParticipantBalance, ParticipantId,
    Result, Trade, TradeId, TxRef, WattmarketError,
};

use crate::balance_ledger::BalanceLedger;
use crate::offer_book::OfferBook;
use crate::trade_log::TradeLog;

/// Request to create an offer. The id and creation tx ref come from the
/// external ledger; everything else from the seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOffer {
    pub id: OfferId,
    pub seller: ParticipantId,
    pub quantity: Decimal,
    pub price_token: Decimal,
    pub price_fiat: Decimal,
    pub create_tx_ref: Option<TxRef>,
}

/// Requested changes to an Active, unexpired offer. `None` leaves a field
/// unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditOffer {
    pub quantity: Option<Decimal>,
    pub price_token: Option<Decimal>,
    pub price_fiat: Option<Decimal>,
}

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Offers matching the sweep predicate.
    pub examined: usize,
    /// Offers actually transitioned.
    pub transitioned: usize,
    /// Per-row failures (logged, never aborting the sweep).
    pub failed: usize,
}

/// What a successfully applied ledger event did.
#[derive(Debug, Clone)]
pub enum AppliedEvent {
    /// Purchase applied: offer Sold, seller settled, trade recorded.
    Sold { offer_id: OfferId, trade: Trade },
    /// Cancellation applied: offer Deleted, reservation released.
    Cancelled { offer_id: OfferId },
}

/// The shared market state all three writers serialize against.
pub struct Market {
    config: MarketConfig,
    ledger: BalanceLedger,
    offers: OfferBook,
    trades: TradeLog,
}

impl Market {
    /// Create an empty market with the given lifecycle windows.
    #[must_use]
    pub fn new(config: MarketConfig) -> Self {
        Self {
            config,
            ledger: BalanceLedger::new(),
            offers: OfferBook::new(),
            trades: TradeLog::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    // =====================================================================
    // Balance operations
    // =====================================================================

    /// Record newly generated energy for a participant.
    pub fn record_generation(&mut self, participant: &ParticipantId, qty: Decimal) -> Result<()> {
        self.ledger.record_generation(participant, qty)
    }

    /// Current balance for a participant.
    #[must_use]
    pub fn balance_of(&self, participant: &ParticipantId) -> ParticipantBalance {
        self.ledger.balance(participant)
    }

    // =====================================================================
    // Lifecycle operations (caller-triggered)
    // =====================================================================

    /// Create an offer: reserve the quantity, then persist the Active offer.
    ///
    /// If persistence fails after a successful reservation, the reservation
    /// is compensated (released) before the error is returned — no partial
    /// state.
    pub fn create_offer(&mut self, req: CreateOffer, now: DateTime<Utc>) -> Result<Offer> {
        if req.quantity <= Decimal::ZERO {
            return Err(WattmarketError::InvalidQuantity {
                reason: format!("offer quantity must be > 0, got {}", req.quantity),
            });
        }
        if req.price_token <= Decimal::ZERO || req.price_fiat <= Decimal::ZERO {
            return Err(WattmarketError::InvalidPrice {
                reason: format!(
                    "prices must be > 0, got {} / {}",
                    req.price_token, req.price_fiat
                ),
            });
        }

        self.ledger.reserve(&req.seller, req.quantity)?;

        let offer = Offer {
            id: req.id,
            seller: req.seller.clone(),
            quantity: req.quantity,
            price_token: req.price_token,
            price_fiat: req.price_fiat,
            status: OfferStatus::Active,
            cancelled: false,
            created_at: now,
            expires_at: now + self.config.expiry_window(),
            auto_delete_at: now + self.config.delete_window(),
            restore_count: 0,
            edit_count: 0,
            cancelled_at: None,
            cancelled_by: None,
            buyer: None,
            create_tx_ref: req.create_tx_ref,
            complete_tx_ref: None,
        };

        if let Err(err) = self.offers.insert(offer.clone()) {
            // Compensate the reservation before surfacing the failure.
            self.ledger.release(&req.seller, req.quantity);
            return Err(err);
        }

        tracing::info!(
            offer = %offer.id,
            seller = %offer.seller.short(),
            qty = %offer.quantity,
            expires_at = %offer.expires_at,
            "Offer created"
        );
        Ok(offer)
    }

    /// Edit an Active, unexpired offer. A quantity increase must pass
    /// `reserve`; a decrease releases the delta.
    pub fn edit_offer(
        &mut self,
        id: OfferId,
        participant: &ParticipantId,
        updates: EditOffer,
        now: DateTime<Utc>,
    ) -> Result<Offer> {
        let offer = self
            .offers
            .get(id)
            .ok_or(WattmarketError::OfferNotFound(id))?;
        if &offer.seller != participant {
            return Err(WattmarketError::Unauthorized {
                offer: id,
                participant: participant.clone(),
            });
        }
        if offer.status != OfferStatus::Active {
            return Err(WattmarketError::InvalidState {
                expected: OfferStatus::Active,
                actual: offer.status,
            });
        }
        if now >= offer.expires_at {
            // Past expiry but not yet swept: effectively Expired.
            return Err(WattmarketError::InvalidState {
                expected: OfferStatus::Active,
                actual: OfferStatus::Expired,
            });
        }

        let old_qty = offer.quantity;
        let new_qty = updates.quantity.unwrap_or(old_qty);
        let new_price_token = updates.price_token.unwrap_or(offer.price_token);
        let new_price_fiat = updates.price_fiat.unwrap_or(offer.price_fiat);

        if new_qty <= Decimal::ZERO {
            return Err(WattmarketError::InvalidQuantity {
                reason: format!("offer quantity must be > 0, got {new_qty}"),
            });
        }
        if new_price_token <= Decimal::ZERO || new_price_fiat <= Decimal::ZERO {
            return Err(WattmarketError::InvalidPrice {
                reason: format!("prices must be > 0, got {new_price_token} / {new_price_fiat}"),
            });
        }

        let seller = offer.seller.clone();
        if new_qty > old_qty {
            self.ledger.reserve(&seller, new_qty - old_qty)?;
        } else if new_qty < old_qty {
            self.ledger.release(&seller, old_qty - new_qty);
        }

        let updated = self.offers.transition(id, OfferStatus::Active, |o| {
            o.quantity = new_qty;
            o.price_token = new_price_token;
            o.price_fiat = new_price_fiat;
            o.edit_count += 1;
        })?;

        tracing::info!(
            offer = %id,
            qty = %new_qty,
            edits = updated.edit_count,
            "Offer edited"
        );
        Ok(updated.clone())
    }

    /// Cancel an Active offer. Requires the literal confirmation sentinel;
    /// a mismatch fails before any mutation. A valid confirmation deletes
    /// immediately — no Expired grace period.
    pub fn cancel_offer(
        &mut self,
        id: OfferId,
        participant: &ParticipantId,
        confirmation: &str,
        now: DateTime<Utc>,
    ) -> Result<Offer> {
        let offer = self
            .offers
            .get(id)
            .ok_or(WattmarketError::OfferNotFound(id))?;
        if &offer.seller != participant {
            return Err(WattmarketError::Unauthorized {
                offer: id,
                participant: participant.clone(),
            });
        }
        if confirmation != self.config.confirmation_token {
            return Err(WattmarketError::InvalidConfirmation);
        }

        let seller = offer.seller.clone();
        let qty = offer.quantity;

        let cancelled = self.offers.transition(id, OfferStatus::Active, |o| {
            o.status = OfferStatus::Deleted;
            o.cancelled = true;
            o.cancelled_at = Some(now);
            o.cancelled_by = Some(participant.clone());
            o.auto_delete_at = now;
        })?;
        let cancelled = cancelled.clone();
        self.ledger.release(&seller, qty);

        tracing::info!(
            offer = %id,
            seller = %seller.short(),
            qty = %qty,
            "Offer cancelled"
        );
        Ok(cancelled)
    }

    /// Restore an Expired offer while its deletion window is still open,
    /// extending both windows from `now`.
    pub fn restore_offer(
        &mut self,
        id: OfferId,
        participant: &ParticipantId,
        now: DateTime<Utc>,
    ) -> Result<Offer> {
        let offer = self
            .offers
            .get(id)
            .ok_or(WattmarketError::OfferNotFound(id))?;
        if &offer.seller != participant {
            return Err(WattmarketError::Unauthorized {
                offer: id,
                participant: participant.clone(),
            });
        }
        if offer.status != OfferStatus::Expired {
            return Err(WattmarketError::InvalidState {
                expected: OfferStatus::Expired,
                actual: offer.status,
            });
        }
        if now >= offer.auto_delete_at {
            // Deletion window closed: effectively Deleted, the sweep just
            // hasn't visited yet.
            return Err(WattmarketError::InvalidState {
                expected: OfferStatus::Expired,
                actual: OfferStatus::Deleted,
            });
        }

        let expiry = self.config.restore_expiry_window();
        let deletion = self.config.restore_delete_window();
        let restored = self.offers.transition(id, OfferStatus::Expired, |o| {
            o.status = OfferStatus::Active;
            o.expires_at = now + expiry;
            o.auto_delete_at = now + deletion;
            o.restore_count += 1;
        })?;

        tracing::info!(
            offer = %id,
            restores = restored.restore_count,
            expires_at = %restored.expires_at,
            "Offer restored"
        );
        Ok(restored.clone())
    }

    // =====================================================================
    // Sweeps (time-triggered)
    // =====================================================================

    /// Flip every overdue Active offer to Expired. Reservations stay held —
    /// restore is still possible. Idempotent: re-running matches nothing.
    pub fn expire_sweep(&mut self, now: DateTime<Utc>) -> SweepReport {
        let due = self.offers.due_for_expiry(now);
        let mut report = SweepReport {
            examined: due.len(),
            ..SweepReport::default()
        };
        for id in due {
            match self.offers.transition(id, OfferStatus::Active, |o| {
                o.status = OfferStatus::Expired;
            }) {
                Ok(_) => report.transitioned += 1,
                Err(err) => {
                    // Lost a race with a cancel or purchase: a no-op, not an error.
                    tracing::debug!(offer = %id, %err, "Expire sweep skipped offer");
                    report.failed += 1;
                }
            }
        }
        if report.examined > 0 {
            tracing::info!(
                examined = report.examined,
                transitioned = report.transitioned,
                failed = report.failed,
                "Expire sweep complete"
            );
        }
        report
    }

    /// Finalize every Expired offer whose deletion window has passed,
    /// releasing its reservation. One row's failure never aborts the rest.
    pub fn delete_sweep(&mut self, now: DateTime<Utc>) -> SweepReport {
        let due = self.offers.due_for_deletion(now);
        let mut report = SweepReport {
            examined: due.len(),
            ..SweepReport::default()
        };
        for id in due {
            let Some(offer) = self.offers.get(id) else {
                report.failed += 1;
                continue;
            };
            let seller = offer.seller.clone();
            let qty = offer.quantity;
            match self.offers.transition(id, OfferStatus::Expired, |o| {
                o.status = OfferStatus::Deleted;
            }) {
                Ok(_) => {
                    self.ledger.release(&seller, qty);
                    report.transitioned += 1;
                }
                Err(err) => {
                    tracing::debug!(offer = %id, %err, "Delete sweep skipped offer");
                    report.failed += 1;
                }
            }
        }
        if report.examined > 0 {
            tracing::info!(
                examined = report.examined,
                transitioned = report.transitioned,
                failed = report.failed,
                "Delete sweep complete"
            );
        }
        report
    }

    // =====================================================================
    // Chain event application
    // =====================================================================

    /// Apply one external ledger event, keyed by its transaction reference.
    ///
    /// A reference that was already applied yields `DuplicateEvent` — the
    /// benign outcome that makes re-delivery and restart-induced
    /// reprocessing safe. The status transition, the ledger adjustment, and
    /// the trade record commit as one unit of work.
    pub fn apply_event(&mut self, event: &LedgerEvent, now: DateTime<Utc>) -> Result<AppliedEvent> {
        match event {
            LedgerEvent::PurchaseCompleted {
                offer_id,
                buyer,
                quantity,
                price_token,
                block_height,
                tx_ref,
                ..
            } => {
                if self.trades.contains(tx_ref) || self.offers.contains_tx_ref(tx_ref) {
                    return Err(WattmarketError::DuplicateEvent(tx_ref.clone()));
                }
                let offer = self
                    .offers
                    .get(*offer_id)
                    .ok_or(WattmarketError::OfferNotFound(*offer_id))?;
                if offer.status != OfferStatus::Active {
                    return Err(WattmarketError::InvalidState {
                        expected: OfferStatus::Active,
                        actual: offer.status,
                    });
                }

                let seller = offer.seller.clone();
                let qty = offer.quantity;
                if *quantity != qty {
                    tracing::warn!(
                        offer = %offer_id,
                        event_qty = %quantity,
                        offer_qty = %qty,
                        "Purchase event quantity differs from offer; settling offer quantity"
                    );
                }

                // Settle first: if the reservation is somehow short, nothing
                // else has mutated yet.
                self.ledger.settle(&seller, qty)?;
                self.offers.transition(*offer_id, OfferStatus::Active, |o| {
                    o.status = OfferStatus::Sold;
                    o.buyer = Some(buyer.clone());
                    o.complete_tx_ref = Some(tx_ref.clone());
                })?;
                self.offers.record_tx_ref(tx_ref.clone());

                let trade = Trade {
                    id: TradeId::new(),
                    offer_id: *offer_id,
                    buyer: buyer.clone(),
                    seller,
                    quantity: qty,
                    price_token: *price_token,
                    block_height: *block_height,
                    tx_ref: tx_ref.clone(),
                    executed_at: now,
                };
                self.trades.record(trade.clone())?;

                tracing::info!(
                    offer = %offer_id,
                    buyer = %buyer.short(),
                    qty = %qty,
                    block = %block_height,
                    "Purchase event applied"
                );
                Ok(AppliedEvent::Sold {
                    offer_id: *offer_id,
                    trade,
                })
            }

            LedgerEvent::OfferCancelled {
                offer_id,
                cancelled_by,
                block_height,
                tx_ref,
                ..
            } => {
                if self.offers.contains_tx_ref(tx_ref) {
                    return Err(WattmarketError::DuplicateEvent(tx_ref.clone()));
                }
                let offer = self
                    .offers
                    .get(*offer_id)
                    .ok_or(WattmarketError::OfferNotFound(*offer_id))?;
                let current = offer.status;
                if !matches!(current, OfferStatus::Active | OfferStatus::Expired) {
                    return Err(WattmarketError::InvalidState {
                        expected: OfferStatus::Active,
                        actual: current,
                    });
                }

                let seller = offer.seller.clone();
                let qty = offer.quantity;
                self.offers.transition(*offer_id, current, |o| {
                    o.status = OfferStatus::Deleted;
                    o.cancelled = true;
                    o.cancelled_at = Some(now);
                    o.cancelled_by = Some(cancelled_by.clone());
                    o.auto_delete_at = now;
                })?;
                self.ledger.release(&seller, qty);
                self.offers.record_tx_ref(tx_ref.clone());

                tracing::info!(
                    offer = %offer_id,
                    by = %cancelled_by.short(),
                    block = %block_height,
                    "Cancel event applied"
                );
                Ok(AppliedEvent::Cancelled {
                    offer_id: *offer_id,
                })
            }
        }
    }

    // =====================================================================
    // Queries
    // =====================================================================

    /// Look up an offer by id.
    pub fn offer(&self, id: OfferId) -> Result<Offer> {
        self.offers
            .get(id)
            .cloned()
            .ok_or(WattmarketError::OfferNotFound(id))
    }

    /// All offers belonging to a participant, any status.
    #[must_use]
    pub fn offers_by_participant(&self, participant: &ParticipantId) -> Vec<Offer> {
        self.offers.by_seller(participant)
    }

    /// All currently Active offers.
    #[must_use]
    pub fn active_offers(&self) -> Vec<Offer> {
        self.offers.active()
    }

    /// All trades recorded for an offer.
    #[must_use]
    pub fn trades_for(&self, offer_id: OfferId) -> Vec<Trade> {
        self.trades
            .by_offer(offer_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Number of trades recorded in total.
    #[must_use]
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    // =====================================================================
    // Invariant audit
    // =====================================================================

    /// Verify the two ledger invariants for every participant:
    /// non-oversell, and `pending_reserved` equal to the sum of that
    /// seller's Active-or-Expired offer quantities.
    pub fn verify_invariants(&self) -> Result<()> {
        use std::collections::HashMap;

        let mut reserved_by_seller: HashMap<&ParticipantId, Decimal> = HashMap::new();
        for offer in self.offers.iter() {
            if matches!(offer.status, OfferStatus::Active | OfferStatus::Expired) {
                *reserved_by_seller.entry(&offer.seller).or_default() += offer.quantity;
            }
        }

        for participant in self.ledger.participants() {
            let bal = self.ledger.balance(participant);
            if !bal.is_consistent() {
                return Err(WattmarketError::Internal(format!(
                    "non-oversell violated for {participant}: available = {}",
                    bal.available()
                )));
            }
            let open = reserved_by_seller
                .get(participant)
                .copied()
                .unwrap_or(Decimal::ZERO);
            if bal.pending_reserved != open {
                return Err(WattmarketError::Internal(format!(
                    "reservation mismatch for {participant}: ledger {} vs offers {open}",
                    bal.pending_reserved
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use wattmarket_types::{BlockHeight, ParticipantId};

    fn funded_market(seller: &ParticipantId, generated: i64) -> Market {
        let mut market = Market::new(MarketConfig::default());
        market
            .record_generation(seller, Decimal::new(generated, 0))
            .unwrap();
        market
    }

    fn create_req(id: u64, seller: &ParticipantId, qty: i64) -> CreateOffer {
        CreateOffer {
            id: OfferId(id),
            seller: seller.clone(),
            quantity: Decimal::new(qty, 0),
            price_token: Decimal::new(12, 2),
            price_fiat: Decimal::new(15, 2),
            create_tx_ref: None,
        }
    }

    fn purchase_event(offer: u64, buyer: &ParticipantId, seller: &ParticipantId, qty: i64, block: u64, tx: &str) -> LedgerEvent {
        LedgerEvent::PurchaseCompleted {
            offer_id: OfferId(offer),
            buyer: buyer.clone(),
            seller: seller.clone(),
            quantity: Decimal::new(qty, 0),
            price_token: Decimal::new(12, 2),
            block_height: BlockHeight(block),
            tx_ref: TxRef::new(tx),
        }
    }

    #[test]
    fn create_reserves_quantity() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();

        let offer = market.create_offer(create_req(1, &seller, 40), now).unwrap();
        assert_eq!(offer.status, OfferStatus::Active);
        assert_eq!(offer.expires_at, now + Duration::days(7));
        assert_eq!(offer.auto_delete_at, now + Duration::days(10));

        let bal = market.balance_of(&seller);
        assert_eq!(bal.pending_reserved, Decimal::new(40, 0));
        assert_eq!(bal.available(), Decimal::new(60, 0));
        market.verify_invariants().unwrap();
    }

    #[test]
    fn create_beyond_available_fails() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();

        let err = market
            .create_offer(create_req(2, &seller, 70), now)
            .unwrap_err();
        assert!(matches!(err, WattmarketError::InsufficientBalance { .. }));
        // First reservation untouched.
        assert_eq!(
            market.balance_of(&seller).pending_reserved,
            Decimal::new(40, 0)
        );
    }

    #[test]
    fn create_compensates_reservation_on_persist_failure() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();

        // Same offer id again: insert fails after reserve succeeded.
        let err = market
            .create_offer(create_req(1, &seller, 30), now)
            .unwrap_err();
        assert!(matches!(err, WattmarketError::DuplicateOffer(_)));
        // The compensating release ran.
        assert_eq!(
            market.balance_of(&seller).pending_reserved,
            Decimal::new(40, 0)
        );
        market.verify_invariants().unwrap();
    }

    #[test]
    fn edit_quantity_up_reserves_delta() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();

        let updates = EditOffer {
            quantity: Some(Decimal::new(60, 0)),
            ..EditOffer::default()
        };
        let offer = market.edit_offer(OfferId(1), &seller, updates, now).unwrap();
        assert_eq!(offer.quantity, Decimal::new(60, 0));
        assert_eq!(offer.edit_count, 1);
        assert_eq!(
            market.balance_of(&seller).pending_reserved,
            Decimal::new(60, 0)
        );
        market.verify_invariants().unwrap();
    }

    #[test]
    fn edit_quantity_down_releases_delta() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();

        let updates = EditOffer {
            quantity: Some(Decimal::new(10, 0)),
            ..EditOffer::default()
        };
        market.edit_offer(OfferId(1), &seller, updates, now).unwrap();
        assert_eq!(
            market.balance_of(&seller).pending_reserved,
            Decimal::new(10, 0)
        );
        market.verify_invariants().unwrap();
    }

    #[test]
    fn edit_beyond_available_fails_atomically() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();

        let updates = EditOffer {
            quantity: Some(Decimal::new(120, 0)),
            ..EditOffer::default()
        };
        let err = market
            .edit_offer(OfferId(1), &seller, updates, now)
            .unwrap_err();
        assert!(matches!(err, WattmarketError::InsufficientBalance { .. }));
        // Offer unchanged.
        let offer = market.offer(OfferId(1)).unwrap();
        assert_eq!(offer.quantity, Decimal::new(40, 0));
        assert_eq!(offer.edit_count, 0);
    }

    #[test]
    fn edit_by_non_seller_unauthorized() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();

        let stranger = ParticipantId::random();
        let err = market
            .edit_offer(OfferId(1), &stranger, EditOffer::default(), now)
            .unwrap_err();
        assert!(matches!(err, WattmarketError::Unauthorized { .. }));
    }

    #[test]
    fn edit_after_expiry_instant_rejected() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();

        let later = now + Duration::days(8);
        let err = market
            .edit_offer(OfferId(1), &seller, EditOffer::default(), later)
            .unwrap_err();
        assert!(matches!(
            err,
            WattmarketError::InvalidState {
                expected: OfferStatus::Active,
                actual: OfferStatus::Expired,
            }
        ));
    }

    #[test]
    fn cancel_requires_confirmation_before_any_mutation() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();

        let err = market
            .cancel_offer(OfferId(1), &seller, "WRONG", now)
            .unwrap_err();
        assert!(matches!(err, WattmarketError::InvalidConfirmation));
        // Offer still Active, reservation untouched.
        assert_eq!(
            market.offer(OfferId(1)).unwrap().status,
            OfferStatus::Active
        );
        assert_eq!(
            market.balance_of(&seller).pending_reserved,
            Decimal::new(40, 0)
        );
    }

    #[test]
    fn cancel_deletes_immediately_and_releases() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();

        let offer = market
            .cancel_offer(OfferId(1), &seller, "DELETE", now)
            .unwrap();
        assert_eq!(offer.status, OfferStatus::Deleted);
        assert!(offer.cancelled);
        assert_eq!(offer.cancelled_by.as_ref(), Some(&seller));
        assert_eq!(offer.auto_delete_at, now);

        let bal = market.balance_of(&seller);
        assert_eq!(bal.pending_reserved, Decimal::ZERO);
        assert_eq!(bal.available(), Decimal::new(100, 0));
        market.verify_invariants().unwrap();
    }

    #[test]
    fn expire_sweep_flips_overdue_offers() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();

        // Before expiry nothing matches.
        let report = market.expire_sweep(now + Duration::days(6));
        assert_eq!(report.examined, 0);

        let report = market.expire_sweep(now + Duration::days(8));
        assert_eq!(report.transitioned, 1);
        assert_eq!(
            market.offer(OfferId(1)).unwrap().status,
            OfferStatus::Expired
        );
        // Reservation still held: restore is possible.
        assert_eq!(
            market.balance_of(&seller).pending_reserved,
            Decimal::new(40, 0)
        );

        // Re-running is a no-op.
        let report = market.expire_sweep(now + Duration::days(8));
        assert_eq!(report.examined, 0);
        market.verify_invariants().unwrap();
    }

    #[test]
    fn delete_sweep_finalizes_and_releases() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();
        market.expire_sweep(now + Duration::days(8));

        let report = market.delete_sweep(now + Duration::days(11));
        assert_eq!(report.transitioned, 1);
        assert_eq!(
            market.offer(OfferId(1)).unwrap().status,
            OfferStatus::Deleted
        );
        let bal = market.balance_of(&seller);
        assert_eq!(bal.pending_reserved, Decimal::ZERO);
        assert_eq!(bal.available(), Decimal::new(100, 0));
        market.verify_invariants().unwrap();
    }

    #[test]
    fn restore_extends_windows_and_counts() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let created = Utc::now();
        market
            .create_offer(create_req(1, &seller, 40), created)
            .unwrap();
        market.expire_sweep(created + Duration::days(8));

        let at = created + Duration::days(9);
        let offer = market.restore_offer(OfferId(1), &seller, at).unwrap();
        assert_eq!(offer.status, OfferStatus::Active);
        assert_eq!(offer.expires_at, at + Duration::days(7));
        assert_eq!(offer.auto_delete_at, at + Duration::days(14));
        assert_eq!(offer.restore_count, 1);
        market.verify_invariants().unwrap();
    }

    #[test]
    fn restore_after_window_closed_rejected() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let created = Utc::now();
        market
            .create_offer(create_req(1, &seller, 40), created)
            .unwrap();
        market.expire_sweep(created + Duration::days(8));

        let err = market
            .restore_offer(OfferId(1), &seller, created + Duration::days(11))
            .unwrap_err();
        assert!(matches!(err, WattmarketError::InvalidState { .. }));
        assert_eq!(
            market.offer(OfferId(1)).unwrap().status,
            OfferStatus::Expired
        );
    }

    #[test]
    fn purchase_event_sells_and_settles() {
        let seller = ParticipantId::random();
        let buyer = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();

        let event = purchase_event(1, &buyer, &seller, 40, 100, "0xsale");
        let applied = market.apply_event(&event, now).unwrap();
        assert!(matches!(applied, AppliedEvent::Sold { .. }));

        let offer = market.offer(OfferId(1)).unwrap();
        assert_eq!(offer.status, OfferStatus::Sold);
        assert_eq!(offer.buyer.as_ref(), Some(&buyer));
        assert_eq!(offer.complete_tx_ref, Some(TxRef::new("0xsale")));

        let bal = market.balance_of(&seller);
        assert_eq!(bal.sold, Decimal::new(40, 0));
        assert_eq!(bal.pending_reserved, Decimal::ZERO);
        assert_eq!(market.trade_count(), 1);
        market.verify_invariants().unwrap();
    }

    #[test]
    fn purchase_event_is_idempotent() {
        let seller = ParticipantId::random();
        let buyer = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();

        let event = purchase_event(1, &buyer, &seller, 40, 100, "0xsale");
        market.apply_event(&event, now).unwrap();
        let err = market.apply_event(&event, now).unwrap_err();
        assert!(err.is_benign(), "Expected benign duplicate, got: {err:?}");

        // Applied exactly once.
        assert_eq!(market.trade_count(), 1);
        assert_eq!(market.balance_of(&seller).sold, Decimal::new(40, 0));
    }

    #[test]
    fn purchase_event_for_unknown_offer_fails() {
        let mut market = Market::new(MarketConfig::default());
        let event = purchase_event(
            9,
            &ParticipantId::random(),
            &ParticipantId::random(),
            40,
            100,
            "0xsale",
        );
        let err = market.apply_event(&event, Utc::now()).unwrap_err();
        assert!(matches!(err, WattmarketError::OfferNotFound(OfferId(9))));
    }

    #[test]
    fn cancel_event_applies_from_expired() {
        let seller = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();
        market.expire_sweep(now + Duration::days(8));

        let event = LedgerEvent::OfferCancelled {
            offer_id: OfferId(1),
            cancelled_by: seller.clone(),
            seller: seller.clone(),
            quantity: Decimal::new(40, 0),
            price_token: Decimal::new(12, 2),
            block_height: BlockHeight(101),
            tx_ref: TxRef::new("0xcancel"),
        };
        let at = now + Duration::days(9);
        market.apply_event(&event, at).unwrap();

        let offer = market.offer(OfferId(1)).unwrap();
        assert_eq!(offer.status, OfferStatus::Deleted);
        assert!(offer.cancelled);
        assert_eq!(market.balance_of(&seller).pending_reserved, Decimal::ZERO);

        // Repeat delivery is benign.
        let err = market.apply_event(&event, at).unwrap_err();
        assert!(err.is_benign());
        market.verify_invariants().unwrap();
    }

    #[test]
    fn purchase_event_rejected_for_expired_offer() {
        let seller = ParticipantId::random();
        let buyer = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();
        market.expire_sweep(now + Duration::days(8));

        // Expired offers can only be restored or deleted, never sold.
        let event = purchase_event(1, &buyer, &seller, 40, 100, "0xsale");
        let err = market
            .apply_event(&event, now + Duration::days(8))
            .unwrap_err();
        assert!(matches!(
            err,
            WattmarketError::InvalidState {
                expected: OfferStatus::Active,
                actual: OfferStatus::Expired,
            }
        ));

        // Nothing settled, nothing recorded.
        let bal = market.balance_of(&seller);
        assert_eq!(bal.sold, Decimal::ZERO);
        assert_eq!(bal.pending_reserved, Decimal::new(40, 0));
        assert_eq!(market.trade_count(), 0);
        market.verify_invariants().unwrap();
    }

    #[test]
    fn state_machine_closure_from_sold() {
        let seller = ParticipantId::random();
        let buyer = ParticipantId::random();
        let mut market = funded_market(&seller, 100);
        let now = Utc::now();
        market.create_offer(create_req(1, &seller, 40), now).unwrap();
        market
            .apply_event(&purchase_event(1, &buyer, &seller, 40, 100, "0xsale"), now)
            .unwrap();

        // Sold is terminal: no cancel, no edit, no sweep touches it.
        let err = market
            .cancel_offer(OfferId(1), &seller, "DELETE", now)
            .unwrap_err();
        assert!(matches!(err, WattmarketError::InvalidState { .. }));
        let report = market.expire_sweep(now + Duration::days(30));
        assert_eq!(report.examined, 0);
        let report = market.delete_sweep(now + Duration::days(30));
        assert_eq!(report.examined, 0);
        assert_eq!(market.offer(OfferId(1)).unwrap().status, OfferStatus::Sold);
    }
}
