//! # wattmarket-scheduler
//!
//! Periodic sweeps applying time-based offer transitions:
//! Active → Expired when `expires_at` passes, and Expired → Deleted
//! (releasing the reservation) when `auto_delete_at` passes.
//!
//! The scheduler exposes no interface beyond start/stop. Sweep logic itself
//! lives in [`wattmarket_engine::Market`]; this crate only owns the cadence
//! and the lifecycle of the two loops.

pub mod scheduler;

pub use scheduler::{ExpirationScheduler, SchedulerHandle};
