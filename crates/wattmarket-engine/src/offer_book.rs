//! Offer store with compare-and-swap status transitions.
//!
//! Every status change goes through [`OfferBook::transition`], which checks
//! the current status against the caller's expected precondition. A writer
//! that lost a race observes `InvalidState` instead of silently overwriting
//! — this is the guard rule that keeps concurrent sweeps, cancels, and
//! reconciled events from corrupting each other's work.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use wattmarket_types::{Offer, OfferId, OfferStatus, ParticipantId, Result, TxRef, WattmarketError};

/// In-memory offer store. Offers are never removed; `Deleted` is terminal.
pub struct OfferBook {
    /// All offers indexed by their external id.
    offers: HashMap<OfferId, Offer>,
    /// Every ledger transaction reference ever recorded against an offer
    /// (create or complete). Global uniqueness is the idempotency guarantee.
    tx_refs: HashSet<TxRef>,
}

impl OfferBook {
    /// Create a new empty book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            offers: HashMap::new(),
            tx_refs: HashSet::new(),
        }
    }

    /// Insert a newly created offer.
    ///
    /// # Errors
    /// Returns `DuplicateOffer` if the id is already known, or
    /// `DuplicateEvent` if the creation tx ref was seen before (replay).
    pub fn insert(&mut self, offer: Offer) -> Result<()> {
        if self.offers.contains_key(&offer.id) {
            return Err(WattmarketError::DuplicateOffer(offer.id));
        }
        if let Some(tx) = &offer.create_tx_ref {
            if self.tx_refs.contains(tx) {
                return Err(WattmarketError::DuplicateEvent(tx.clone()));
            }
            self.tx_refs.insert(tx.clone());
        }
        self.offers.insert(offer.id, offer);
        Ok(())
    }

    /// Look up an offer by id.
    #[must_use]
    pub fn get(&self, id: OfferId) -> Option<&Offer> {
        self.offers.get(&id)
    }

    /// Apply a status transition, compare-and-swap style.
    ///
    /// The mutation `f` runs only if the offer's current status equals
    /// `expected`; `f` is responsible for setting the new status.
    ///
    /// # Errors
    /// Returns `OfferNotFound` for an unknown id, or `InvalidState` if the
    /// current status does not match `expected` (no mutation happens).
    pub fn transition(
        &mut self,
        id: OfferId,
        expected: OfferStatus,
        f: impl FnOnce(&mut Offer),
    ) -> Result<&Offer> {
        let offer = self
            .offers
            .get_mut(&id)
            .ok_or(WattmarketError::OfferNotFound(id))?;
        if offer.status != expected {
            return Err(WattmarketError::InvalidState {
                expected,
                actual: offer.status,
            });
        }
        f(offer);
        Ok(offer)
    }

    /// Whether a transaction reference has already been recorded.
    #[must_use]
    pub fn contains_tx_ref(&self, tx: &TxRef) -> bool {
        self.tx_refs.contains(tx)
    }

    /// Record a transaction reference (e.g. a completion tx at sale time).
    pub fn record_tx_ref(&mut self, tx: TxRef) {
        self.tx_refs.insert(tx);
    }

    /// All offers belonging to a seller, any status.
    #[must_use]
    pub fn by_seller(&self, seller: &ParticipantId) -> Vec<Offer> {
        let mut offers: Vec<Offer> = self
            .offers
            .values()
            .filter(|o| &o.seller == seller)
            .cloned()
            .collect();
        offers.sort_by_key(|o| o.id);
        offers
    }

    /// All currently Active offers.
    #[must_use]
    pub fn active(&self) -> Vec<Offer> {
        let mut offers: Vec<Offer> = self
            .offers
            .values()
            .filter(|o| o.status == OfferStatus::Active)
            .cloned()
            .collect();
        offers.sort_by_key(|o| o.id);
        offers
    }

    /// Active offers whose expiry instant has passed.
    #[must_use]
    pub fn due_for_expiry(&self, now: DateTime<Utc>) -> Vec<OfferId> {
        let mut ids: Vec<OfferId> = self
            .offers
            .values()
            .filter(|o| o.status == OfferStatus::Active && o.expires_at <= now)
            .map(|o| o.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Expired offers whose deletion instant has passed.
    #[must_use]
    pub fn due_for_deletion(&self, now: DateTime<Utc>) -> Vec<OfferId> {
        let mut ids: Vec<OfferId> = self
            .offers
            .values()
            .filter(|o| o.status == OfferStatus::Expired && o.auto_delete_at <= now)
            .map(|o| o.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over every offer in the book, any status.
    pub fn iter(&self) -> impl Iterator<Item = &Offer> {
        self.offers.values()
    }

    /// Number of offers in the book (all statuses).
    #[must_use]
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    /// Whether the book holds no offers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}

impl Default for OfferBook {
    fn default() -> Self {
        Self::new()
    }
}
