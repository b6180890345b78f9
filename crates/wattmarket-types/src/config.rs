//! Configuration types for the wattmarket engine.
//!
//! All day-count windows are configuration with defaults in
//! [`constants`](crate::constants) — never hard-coded at use sites.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Offer lifecycle windows and the cancel confirmation sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Days from creation until an Active offer expires.
    pub expiry_days: i64,
    /// Days from creation until an unsold offer is auto-deleted.
    pub delete_after_create_days: i64,
    /// Days a restored offer stays Active before expiring again.
    pub restore_expiry_days: i64,
    /// Days from restore until auto-deletion.
    pub restore_delete_days: i64,
    /// Literal token a caller must supply to cancel an offer.
    pub confirmation_token: String,
}

impl MarketConfig {
    #[must_use]
    pub fn expiry_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.expiry_days)
    }

    #[must_use]
    pub fn delete_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.delete_after_create_days)
    }

    #[must_use]
    pub fn restore_expiry_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.restore_expiry_days)
    }

    #[must_use]
    pub fn restore_delete_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.restore_delete_days)
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            expiry_days: constants::DEFAULT_EXPIRY_DAYS,
            delete_after_create_days: constants::DEFAULT_DELETE_AFTER_CREATE_DAYS,
            restore_expiry_days: constants::DEFAULT_RESTORE_EXPIRY_DAYS,
            restore_delete_days: constants::DEFAULT_RESTORE_DELETE_DAYS,
            confirmation_token: constants::CANCEL_CONFIRMATION_TOKEN.to_string(),
        }
    }
}

/// Cadences for the expiration scheduler's two sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Interval between Active → Expired sweeps.
    pub expire_interval: Duration,
    /// Interval between auto-delete sweeps.
    pub delete_interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            expire_interval: Duration::from_secs(constants::DEFAULT_EXPIRE_SWEEP_SECS),
            delete_interval: Duration::from_secs(constants::DEFAULT_DELETE_SWEEP_SECS),
        }
    }
}

/// Tuning for the chain event reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Cursor identity; lets several consumers index independently.
    pub service_name: String,
    /// Maximum block span per historical query (upstream query-size limit).
    pub chunk_blocks: u64,
    /// Poll interval once the backlog is drained and the loop is live.
    pub poll_interval: Duration,
    /// Base delay for exponential retry backoff on upstream failures.
    pub retry_base: Duration,
    /// Retry attempts before the current tick is skipped.
    pub max_retries: u32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            service_name: constants::DEFAULT_RECONCILER_SERVICE.to_string(),
            chunk_blocks: constants::DEFAULT_CHUNK_BLOCKS,
            poll_interval: Duration::from_secs(constants::DEFAULT_POLL_INTERVAL_SECS),
            retry_base: Duration::from_millis(constants::DEFAULT_RETRY_BASE_MS),
            max_retries: constants::DEFAULT_MAX_RETRIES,
        }
    }
}
