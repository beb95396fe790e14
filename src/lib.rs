//! LiveQ - Adaptive admission control for rate-limited upstreams
//!
//! LiveQ sits between bursty callers and a third-party service that
//! throttles aggressively. Callers submit work and get an id back
//! immediately; a background dispatcher drains the queue at a bounded
//! concurrency, backs off adaptively when the upstream pushes back, and
//! broadcasts every state change so UIs can show live queue health.
//!
//! # Core Concepts
//!
//! - **Two queues, one line**: Urgent work cuts to the front; everything
//!   else is FIFO, with aging promotion so nothing starves
//! - **Adaptive cooldown**: Rate-limit failures grow the pause between
//!   dispatches; sustained success shrinks it back down
//! - **Fire and forget**: Admission never blocks on the upstream, and
//!   rate-limited work retries itself as urgent
//! - **Observable**: Status snapshots, wait estimates, and a broadcast
//!   event stream
//!
//! # Modules
//!
//! - [`scheduler`] - Queue manager, dispatcher, cooldown, statistics
//! - [`domain`] - Task records, ids, and the [`Work`] trait
//! - [`events`] - Broadcast event bus and event types
//! - [`config`] - Config file loading and validation
//! - [`cli`] - The `lq` command line

pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod scheduler;

// Convenience re-exports
pub use config::QueueConfig;
pub use domain::{FnWork, QueuedTask, TaskId, TaskRecord, Work, WorkError, WorkResult, work_fn};
pub use events::{EventBus, QueueEvent, QueueStatus};
pub use scheduler::{MAX_COOLDOWN_MS, MIN_COOLDOWN_MS, QueueKind, QueueManager, QueuePosition};
