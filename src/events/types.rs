//! Event types for queue activity streaming
//!
//! These events represent everything observable about the queue:
//! - composition changes (admission, dispatch, aging)
//! - task outcomes (completion, terminal failure)
//! - rate-limit pushback and cooldown movement

use serde::{Deserialize, Serialize};

use crate::domain::TaskRecord;

/// Point-in-time snapshot of queue health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Tasks currently executing
    pub active: usize,

    /// Tasks waiting in the priority queue
    pub priority_queued: usize,

    /// Tasks waiting in the normal queue
    pub normal_queued: usize,

    /// Current adaptive cooldown value in milliseconds
    pub cooldown_ms: u64,

    /// Whether dispatch is currently paused
    pub in_cooldown: bool,

    /// Smoothed processing latency; None until the first completion
    pub avg_processing_ms: Option<f64>,

    /// Successful completions since startup
    pub total_processed: u64,

    /// Failures since startup, rate-limit ones included
    pub total_failed: u64,

    /// Failures per successful completion, as a percentage
    pub failure_rate: f64,
}

/// Core event enum - the vocabulary of queue activity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QueueEvent {
    /// Queue composition or counters changed
    StatusChanged { status: QueueStatus },

    /// A task finished successfully
    TaskCompleted { task: TaskRecord, latency_ms: u64 },

    /// A task failed terminally (not rate-limit pushback)
    TaskFailed { task: TaskRecord, error: String },

    /// The upstream rejected a call for rate reasons
    RateLimitHit { cooldown_ms: u64 },

    /// The adaptive cooldown settled on a new value
    CooldownChanged { cooldown_ms: u64 },

    /// Normal tasks were promoted after waiting past the age threshold
    TasksAged { count: usize },
}

impl QueueEvent {
    /// Variant name, for logs and event filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            QueueEvent::StatusChanged { .. } => "StatusChanged",
            QueueEvent::TaskCompleted { .. } => "TaskCompleted",
            QueueEvent::TaskFailed { .. } => "TaskFailed",
            QueueEvent::RateLimitHit { .. } => "RateLimitHit",
            QueueEvent::CooldownChanged { .. } => "CooldownChanged",
            QueueEvent::TasksAged { .. } => "TasksAged",
        }
    }
}
