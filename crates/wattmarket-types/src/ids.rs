//! Identifiers used throughout wattmarket.
//!
//! Offer ids and transaction references are assigned by the external energy
//! ledger and carried through unchanged — they are the idempotency keys for
//! reconciliation. Trade record ids are internal and use UUIDv7 for
//! time-ordered lexicographic sorting.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ParticipantId
// ---------------------------------------------------------------------------

/// Stable wallet identifier for a market participant.
///
/// Participants are identified by their wallet address on the external
/// ledger; the engine treats the address as an opaque string key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    #[must_use]
    pub fn new(wallet: impl Into<String>) -> Self {
        Self(wallet.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines (first 10 chars of the address).
    /// The address is an opaque string, so truncation must respect char
    /// boundaries.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0
            .char_indices()
            .nth(10)
            .map_or(self.0.as_str(), |(i, _)| &self.0[..i])
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl ParticipantId {
    /// Random 20-byte hex wallet address, `0x`-prefixed.
    #[must_use]
    pub fn random() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(format!("0x{}", hex::encode(bytes)))
    }
}

// ---------------------------------------------------------------------------
// OfferId
// ---------------------------------------------------------------------------

/// Unique offer identifier, assigned by the external ledger at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OfferId(pub u64);

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offer:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TradeId
// ---------------------------------------------------------------------------

/// Internal identifier for a recorded trade. Uses UUIDv7 so trade records
/// sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TradeId(pub Uuid);

impl TradeId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TxRef
// ---------------------------------------------------------------------------

/// Globally unique transaction reference from the external ledger.
///
/// Every consumed event carries one; it is the idempotency key that makes
/// re-delivery and restart-induced reprocessing safe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TxRef(pub String);

impl TxRef {
    #[must_use]
    pub fn new(tx: impl Into<String>) -> Self {
        Self(tx.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// BlockHeight
// ---------------------------------------------------------------------------

/// Block height on the external ledger. Events arrive in non-decreasing
/// block order; the indexer cursor is expressed in these units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BlockHeight(pub u64);

impl BlockHeight {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Saturating predecessor. Height 0 has no predecessor.
    #[must_use]
    pub fn prev(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_id_uniqueness() {
        let a = TradeId::new();
        let b = TradeId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn trade_id_ordering() {
        let a = TradeId::new();
        let b = TradeId::new();
        assert!(a < b);
    }

    #[test]
    fn participant_short_form() {
        let p = ParticipantId::new("0xdeadbeefcafe0123456789");
        assert_eq!(p.short(), "0xdeadbeef");
    }

    #[test]
    fn participant_short_form_tiny_address() {
        let p = ParticipantId::new("0xab");
        assert_eq!(p.short(), "0xab");
    }

    #[test]
    fn participant_short_form_multibyte_address() {
        // Byte 10 lands inside a multi-byte char; short() must not panic
        // and must cut on a char boundary.
        let p = ParticipantId::new("0xabcdef🔥wallet");
        assert_eq!(p.short(), "0xabcdef🔥w");

        let all_multibyte = ParticipantId::new("🔥🔥🔥");
        assert_eq!(all_multibyte.short(), "🔥🔥🔥");
    }

    #[test]
    fn random_participants_differ() {
        let a = ParticipantId::random();
        let b = ParticipantId::random();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("0x"));
        assert_eq!(a.as_str().len(), 42);
    }

    #[test]
    fn block_height_next_prev() {
        let h = BlockHeight(10);
        assert_eq!(h.next(), BlockHeight(11));
        assert_eq!(h.prev(), BlockHeight(9));
        assert_eq!(BlockHeight(0).prev(), BlockHeight(0));
    }

    #[test]
    fn display_forms() {
        assert_eq!(format!("{}", OfferId(7)), "offer:7");
        assert_eq!(format!("{}", BlockHeight(42)), "block:42");
        assert_eq!(format!("{}", TxRef::new("abc")), "tx:abc");
    }

    #[test]
    fn serde_roundtrips() {
        let oid = OfferId(99);
        let json = serde_json::to_string(&oid).unwrap();
        let back: OfferId = serde_json::from_str(&json).unwrap();
        assert_eq!(oid, back);

        let tx = TxRef::new("0xf00");
        let json = serde_json::to_string(&tx).unwrap();
        let back: TxRef = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, back);
    }
}
