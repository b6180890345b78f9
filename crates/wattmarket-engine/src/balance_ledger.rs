//! Per-participant energy accounting.
//!
//! Tracks generated/sold/reserved totals per wallet. All mutations are
//! atomic read-modify-writes: either the full operation succeeds or the
//! balance is unchanged. The ledger is the enforcement point for the
//! non-oversell invariant `generated − sold − pending_reserved ≥ 0`.

use std::collections::HashMap;

use rust_decimal::Decimal;
use wattmarket_types::{ParticipantBalance, ParticipantId, Result, WattmarketError};

/// Manages participant balances with generated/sold/reserved accounting.
///
/// The BalanceLedger is the source of truth for all balance state. The
/// Market calls into it to reserve/release energy as offers open and
/// close, and to settle on verified sales.
pub struct BalanceLedger {
    /// Per-participant balances.
    balances: HashMap<ParticipantId, ParticipantBalance>,
}

impl BalanceLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    /// Record newly generated energy (increases `generated`).
    ///
    /// # Errors
    /// Returns `InvalidQuantity` if `qty` is not strictly positive.
    pub fn record_generation(&mut self, participant: &ParticipantId, qty: Decimal) -> Result<()> {
        if qty <= Decimal::ZERO {
            return Err(WattmarketError::InvalidQuantity {
                reason: format!("generation must be > 0, got {qty}"),
            });
        }
        let entry = self.balances.entry(participant.clone()).or_default();
        entry.generated += qty;
        Ok(())
    }

    /// Reserve energy against a new or grown offer (increases
    /// `pending_reserved`). Succeeds only if `available ≥ qty`.
    ///
    /// # Errors
    /// Returns `InvalidQuantity` if `qty` is not strictly positive, or
    /// `InsufficientBalance` if the participant cannot cover it. Neither
    /// failure changes the balance.
    pub fn reserve(&mut self, participant: &ParticipantId, qty: Decimal) -> Result<()> {
        if qty <= Decimal::ZERO {
            return Err(WattmarketError::InvalidQuantity {
                reason: format!("reservation must be > 0, got {qty}"),
            });
        }
        let entry = self.balances.entry(participant.clone()).or_default();
        let available = entry.available();
        if available < qty {
            return Err(WattmarketError::InsufficientBalance {
                needed: qty,
                available,
            });
        }
        entry.pending_reserved += qty;
        Ok(())
    }

    /// Release a reservation (offer deleted, cancelled, or shrunk).
    ///
    /// `pending_reserved` never goes below zero; releasing more than is
    /// reserved clamps to zero. Returns the amount actually released.
    pub fn release(&mut self, participant: &ParticipantId, qty: Decimal) -> Decimal {
        let Some(entry) = self.balances.get_mut(participant) else {
            return Decimal::ZERO;
        };
        let released = qty.min(entry.pending_reserved).max(Decimal::ZERO);
        entry.pending_reserved -= released;
        released
    }

    /// Settle a verified sale: `pending_reserved −= qty`, `sold += qty`.
    ///
    /// # Errors
    /// Returns `ReservationUnderflow` if less than `qty` is reserved —
    /// settling unreserved energy would corrupt `sold`.
    pub fn settle(&mut self, participant: &ParticipantId, qty: Decimal) -> Result<()> {
        let entry = self.balances.get_mut(participant).ok_or(
            WattmarketError::ReservationUnderflow {
                requested: qty,
                reserved: Decimal::ZERO,
            },
        )?;
        if entry.pending_reserved < qty {
            return Err(WattmarketError::ReservationUnderflow {
                requested: qty,
                reserved: entry.pending_reserved,
            });
        }
        entry.pending_reserved -= qty;
        entry.sold += qty;
        Ok(())
    }

    /// Get the balance for a participant.
    #[must_use]
    pub fn balance(&self, participant: &ParticipantId) -> ParticipantBalance {
        self.balances
            .get(participant)
            .cloned()
            .unwrap_or_default()
    }

    /// All participants with a recorded balance.
    pub fn participants(&self) -> impl Iterator<Item = &ParticipantId> {
        self.balances.keys()
    }

    /// Total energy generated across all participants.
    #[must_use]
    pub fn total_generated(&self) -> Decimal {
        self.balances.values().map(|b| b.generated).sum()
    }
}

impl Default for BalanceLedger {
    fn default() -> Self {
        Self::new()
    }
}
