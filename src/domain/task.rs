//! Task records and queue residency

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::id::TaskId;
use super::work::Work;

/// Observable description of an admitted task
///
/// This is the shape events carry; the executable work itself is not
/// serializable and stays inside the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,

    /// Opaque caller payload, passed through untouched
    pub metadata: serde_json::Value,

    /// Current classification; aging can flip this to true
    pub is_priority: bool,

    pub added_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Build a record for freshly admitted work
    pub fn new(is_priority: bool, metadata: serde_json::Value) -> Self {
        Self {
            id: TaskId::generate(),
            metadata,
            is_priority,
            added_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

/// A task resident in a wait queue
///
/// Couples the observable record with the executable work and the
/// monotonic admission instant that aging and wait accounting use.
#[derive(Clone)]
pub struct QueuedTask {
    pub record: TaskRecord,
    pub work: Arc<dyn Work>,
    pub queued_at: Instant,
}

impl QueuedTask {
    pub fn new(work: Arc<dyn Work>, is_priority: bool, metadata: serde_json::Value) -> Self {
        Self {
            record: TaskRecord::new(is_priority, metadata),
            work,
            queued_at: Instant::now(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.record.id
    }
}

impl fmt::Debug for QueuedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedTask")
            .field("record", &self.record)
            .field("queued_at", &self.queued_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::work::work_fn;
    use serde_json::json;

    #[tokio::test]
    async fn test_record_stamps_admission_only() {
        let record = TaskRecord::new(false, json!({"text": "hola"}));

        assert!(!record.is_priority);
        assert!(record.started_at.is_none());
        assert!(record.completed_at.is_none());
        assert_eq!(record.metadata["text"], "hola");
    }

    #[tokio::test]
    async fn test_queued_task_carries_record() {
        let work = work_fn(|| async { Ok(()) });
        let task = QueuedTask::new(work, true, json!({"n": 1}));

        assert!(task.record.is_priority);
        assert_eq!(task.id(), task.record.id);
    }

    #[test]
    fn test_record_serializes_metadata_through() {
        let record = TaskRecord::new(true, json!({"source": "en", "target": "de"}));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["is_priority"], true);
        assert_eq!(value["metadata"]["target"], "de");
        assert!(value["started_at"].is_null());
    }
}
