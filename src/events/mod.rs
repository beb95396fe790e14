//! Queue activity events
//!
//! The queue manager emits an event for every state change; consumers
//! subscribe through a broadcast bus.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::{QueueEvent, QueueStatus};
