//! Per-participant energy accounting.
//!
//! Every participant carries cumulative `generated` and `sold` totals plus
//! `pending_reserved`, the sum of quantities of their own Active-or-Expired
//! offers. The sellable remainder is derived, never stored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A participant's energy balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantBalance {
    /// Cumulative energy generated (kWh).
    pub generated: Decimal,
    /// Cumulative energy sold through completed trades (kWh).
    pub sold: Decimal,
    /// Energy held against the participant's own open offers (kWh).
    pub pending_reserved: Decimal,
}

impl ParticipantBalance {
    /// Create a zero balance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            generated: Decimal::ZERO,
            sold: Decimal::ZERO,
            pending_reserved: Decimal::ZERO,
        }
    }

    /// Energy still sellable: `generated − sold − pending_reserved`.
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.generated - self.sold - self.pending_reserved
    }

    /// The non-oversell invariant: available never goes negative.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.available() >= Decimal::ZERO
    }

    /// Whether this entry carries no balance at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.generated.is_zero() && self.sold.is_zero() && self.pending_reserved.is_zero()
    }
}

impl Default for ParticipantBalance {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zero() {
        let bal = ParticipantBalance::default();
        assert!(bal.is_zero());
        assert_eq!(bal.available(), Decimal::ZERO);
        assert!(bal.is_consistent());
    }

    #[test]
    fn available_is_derived() {
        let bal = ParticipantBalance {
            generated: Decimal::new(100, 0),
            sold: Decimal::new(30, 0),
            pending_reserved: Decimal::new(40, 0),
        };
        assert_eq!(bal.available(), Decimal::new(30, 0));
        assert!(bal.is_consistent());
    }

    #[test]
    fn oversold_balance_is_inconsistent() {
        let bal = ParticipantBalance {
            generated: Decimal::new(10, 0),
            sold: Decimal::new(5, 0),
            pending_reserved: Decimal::new(10, 0),
        };
        assert!(!bal.is_consistent());
    }

    #[test]
    fn serde_roundtrip() {
        let bal = ParticipantBalance {
            generated: Decimal::new(12345, 3), // 12.345 kWh
            sold: Decimal::new(1, 0),
            pending_reserved: Decimal::new(5, 1),
        };
        let json = serde_json::to_string(&bal).unwrap();
        let back: ParticipantBalance = serde_json::from_str(&json).unwrap();
        assert_eq!(bal, back);
    }
}
