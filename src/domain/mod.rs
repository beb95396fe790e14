//! Domain types for liveq
//!
//! Task records and ids, the work seam the queue dispatches through,
//! and the error vocabulary work reports back with.

mod error;
mod id;
mod task;
mod work;

pub use error::WorkError;
pub use id::TaskId;
pub use task::{QueuedTask, TaskRecord};
pub use work::{FnWork, Work, WorkResult, work_fn};
