//! Error types for the wattmarket engine.
//!
//! All errors use the `WM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Offer / state machine errors
//! - 2xx: Balance errors
//! - 3xx: Authorization / confirmation errors
//! - 4xx: Reconciliation errors
//! - 9xx: General / internal errors
//!
//! Caller errors (1xx–3xx) are never retried and never partially apply.
//! `DuplicateEvent` is benign and swallowed by the reconciler.
//! `UpstreamUnavailable` and `PersistenceConflict` are retried internally.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{OfferId, OfferStatus, ParticipantId, TxRef};

/// Central error enum for all wattmarket operations.
#[derive(Debug, Error)]
pub enum WattmarketError {
    // =================================================================
    // Offer / State Machine Errors (1xx)
    // =================================================================
    /// The requested offer is not known locally.
    #[error("WM_ERR_100: Offer not found: {0}")]
    OfferNotFound(OfferId),

    /// A transition observed a status different from its precondition.
    #[error("WM_ERR_101: Invalid offer state: expected {expected}, got {actual}")]
    InvalidState {
        expected: OfferStatus,
        actual: OfferStatus,
    },

    /// An offer with this id already exists.
    #[error("WM_ERR_102: Offer already exists: {0}")]
    DuplicateOffer(OfferId),

    /// Quantity must be strictly positive.
    #[error("WM_ERR_103: Invalid quantity: {reason}")]
    InvalidQuantity { reason: String },

    /// Price must be strictly positive.
    #[error("WM_ERR_104: Invalid price: {reason}")]
    InvalidPrice { reason: String },

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Not enough available energy to reserve.
    #[error("WM_ERR_200: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    /// A settle would consume more than is reserved.
    #[error("WM_ERR_201: Reservation underflow: settling {requested}, reserved {reserved}")]
    ReservationUnderflow {
        requested: Decimal,
        reserved: Decimal,
    },

    // =================================================================
    // Authorization / Confirmation Errors (3xx)
    // =================================================================
    /// The participant is not the seller of the offer.
    #[error("WM_ERR_300: Unauthorized: {participant} is not the seller of {offer}")]
    Unauthorized {
        offer: OfferId,
        participant: ParticipantId,
    },

    /// The cancel confirmation token did not match the sentinel.
    #[error("WM_ERR_301: Invalid cancel confirmation")]
    InvalidConfirmation,

    // =================================================================
    // Reconciliation Errors (4xx)
    // =================================================================
    /// The event's transaction reference was already applied. Benign.
    #[error("WM_ERR_400: Duplicate event: {0} already applied")]
    DuplicateEvent(TxRef),

    /// The external ledger could not be queried. Retried with backoff.
    #[error("WM_ERR_401: Upstream unavailable: {reason}")]
    UpstreamUnavailable { reason: String },

    /// Optimistic-concurrency loss against the persisted store.
    #[error("WM_ERR_402: Persistence conflict: {reason}")]
    PersistenceConflict { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("WM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("WM_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config, missing fields, etc.).
    #[error("WM_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("WM_ERR_903: I/O error: {0}")]
    Io(String),
}

impl WattmarketError {
    /// Benign outcomes are swallowed by the reconciler, not surfaced.
    #[must_use]
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::DuplicateEvent(_))
    }

    /// Transient infrastructure failures, retried with bounded backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. } | Self::PersistenceConflict { .. }
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, WattmarketError>;

// Conversion from std::io::Error
impl From<std::io::Error> for WattmarketError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
