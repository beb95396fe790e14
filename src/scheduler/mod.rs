//! Admission control and dispatch
//!
//! The [`QueueManager`] is the crate's entry point: it owns the
//! dual-priority queues, the concurrency cap, the adaptive cooldown,
//! and the rolling latency statistics, and it runs the background
//! dispatcher that ties them together.

mod cooldown;
mod core;
mod queues;
mod stats;

pub use cooldown::{MAX_COOLDOWN_MS, MIN_COOLDOWN_MS};
pub use core::QueueManager;
pub use queues::{QueueKind, QueuePosition};
