//! System-wide constants and configuration defaults for wattmarket.
//!
//! Day-count windows are defaults for [`MarketConfig`](crate::MarketConfig),
//! never hard-coded at use sites.

/// Default days from creation until an Active offer expires.
pub const DEFAULT_EXPIRY_DAYS: i64 = 7;

/// Default days from creation until an unsold offer is auto-deleted.
pub const DEFAULT_DELETE_AFTER_CREATE_DAYS: i64 = 10;

/// Default days a restored offer stays Active before expiring again.
pub const DEFAULT_RESTORE_EXPIRY_DAYS: i64 = 7;

/// Default days from restore until auto-deletion.
pub const DEFAULT_RESTORE_DELETE_DAYS: i64 = 14;

/// Literal confirmation token required to cancel an offer.
pub const CANCEL_CONFIRMATION_TOKEN: &str = "DELETE";

/// Default interval between expire sweeps (seconds).
pub const DEFAULT_EXPIRE_SWEEP_SECS: u64 = 3_600;

/// Default interval between delete sweeps (seconds).
pub const DEFAULT_DELETE_SWEEP_SECS: u64 = 21_600;

/// Default reconciler backlog chunk size (blocks per historical query),
/// bounded to respect upstream query-size limits.
pub const DEFAULT_CHUNK_BLOCKS: u64 = 2_000;

/// Default reconciler live-poll interval (seconds).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Default base delay for reconciler retry backoff (milliseconds).
pub const DEFAULT_RETRY_BASE_MS: u64 = 500;

/// Default maximum retry attempts before a reconciler tick is skipped.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default cursor identity for the chain event reconciler.
pub const DEFAULT_RECONCILER_SERVICE: &str = "chain-event-reconciler";
