//! Async façade over the market aggregate.
//!
//! The `LifecycleService` is the only component external callers invoke
//! synchronously. It serializes every mutation through one
//! `tokio::sync::Mutex` around the [`Market`]; the scheduler and reconciler
//! clone the same handle, so all three writers contend on the same lock.
//! Critical sections stay short — no I/O happens while holding it.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use wattmarket_types::{
    Clock, OfferId, OfferView, ParticipantBalance, ParticipantId, Result,
};

use crate::market::{CreateOffer, EditOffer, Market, SweepReport};

/// Shared handle to the market aggregate.
pub type SharedMarket = Arc<Mutex<Market>>;

/// Caller-facing orchestration for offer create/edit/cancel/restore.
#[derive(Clone)]
pub struct LifecycleService {
    market: SharedMarket,
    clock: Arc<dyn Clock>,
}

impl LifecycleService {
    #[must_use]
    pub fn new(market: SharedMarket, clock: Arc<dyn Clock>) -> Self {
        Self { market, clock }
    }

    /// The shared market handle, for wiring up the scheduler and reconciler.
    #[must_use]
    pub fn market(&self) -> SharedMarket {
        Arc::clone(&self.market)
    }

    /// Record newly generated energy for a participant.
    pub async fn record_generation(&self, participant: &ParticipantId, qty: Decimal) -> Result<()> {
        self.market.lock().await.record_generation(participant, qty)
    }

    /// Current balance for a participant.
    pub async fn balance_of(&self, participant: &ParticipantId) -> ParticipantBalance {
        self.market.lock().await.balance_of(participant)
    }

    /// Create an offer, reserving its quantity.
    pub async fn create(&self, req: CreateOffer) -> Result<OfferView> {
        let now = self.clock.now();
        let offer = self.market.lock().await.create_offer(req, now)?;
        Ok(OfferView::at(offer, now))
    }

    /// Edit an Active, unexpired offer.
    pub async fn edit(
        &self,
        id: OfferId,
        participant: &ParticipantId,
        updates: EditOffer,
    ) -> Result<OfferView> {
        let now = self.clock.now();
        let offer = self
            .market
            .lock()
            .await
            .edit_offer(id, participant, updates, now)?;
        Ok(OfferView::at(offer, now))
    }

    /// Cancel an Active offer with the confirmation sentinel.
    pub async fn cancel(
        &self,
        id: OfferId,
        participant: &ParticipantId,
        confirmation: &str,
    ) -> Result<OfferView> {
        let now = self.clock.now();
        let offer = self
            .market
            .lock()
            .await
            .cancel_offer(id, participant, confirmation, now)?;
        Ok(OfferView::at(offer, now))
    }

    /// Restore an Expired offer while its deletion window is open.
    pub async fn restore(&self, id: OfferId, participant: &ParticipantId) -> Result<OfferView> {
        let now = self.clock.now();
        let offer = self
            .market
            .lock()
            .await
            .restore_offer(id, participant, now)?;
        Ok(OfferView::at(offer, now))
    }

    /// Run an expire sweep immediately, outside the scheduler cadence.
    pub async fn force_expire_sweep(&self) -> SweepReport {
        let now = self.clock.now();
        self.market.lock().await.expire_sweep(now)
    }

    /// Run a delete sweep immediately, outside the scheduler cadence.
    pub async fn force_delete_sweep(&self) -> SweepReport {
        let now = self.clock.now();
        self.market.lock().await.delete_sweep(now)
    }

    /// One offer's current projection.
    pub async fn offer(&self, id: OfferId) -> Result<OfferView> {
        let now = self.clock.now();
        let offer = self.market.lock().await.offer(id)?;
        Ok(OfferView::at(offer, now))
    }

    /// All of a participant's offers, any status, projected at now.
    pub async fn offers_by_participant(&self, participant: &ParticipantId) -> Vec<OfferView> {
        let now = self.clock.now();
        let offers = self.market.lock().await.offers_by_participant(participant);
        offers.into_iter().map(|o| OfferView::at(o, now)).collect()
    }

    /// All currently Active offers, projected at now.
    pub async fn active_offers(&self) -> Vec<OfferView> {
        let now = self.clock.now();
        let offers = self.market.lock().await.active_offers();
        offers.into_iter().map(|o| OfferView::at(o, now)).collect()
    }
}
