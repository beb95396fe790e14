//! Dual-queue storage with aging promotion

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::{QueuedTask, TaskId};

/// Which queue a waiting task currently sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Priority,
    Normal,
}

/// 1-based position of a waiting task across both queues
///
/// Normal-queue positions count everything in the priority queue ahead
/// of them, so the number reflects true dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePosition {
    pub position: usize,
    pub queue: QueueKind,
}

/// The two wait queues
///
/// Urgent submissions jump to the front of the priority queue, so the
/// most recent urgent work dispatches first. Tasks promoted by aging
/// append at the priority tail, behind urgent work but ahead of every
/// normal task. The normal queue is plain FIFO.
#[derive(Debug, Default)]
pub struct TaskQueues {
    priority: VecDeque<QueuedTask>,
    normal: VecDeque<QueuedTask>,
}

impl TaskQueues {
    pub fn new() -> Self {
        Self {
            priority: VecDeque::new(),
            normal: VecDeque::new(),
        }
    }

    /// Admit a task into the queue its flag selects
    pub fn push(&mut self, task: QueuedTask) {
        if task.record.is_priority {
            self.priority.push_front(task);
        } else {
            self.normal.push_back(task);
        }
    }

    /// Take the next task to dispatch; the priority queue drains first
    pub fn pop_next(&mut self) -> Option<QueuedTask> {
        self.priority.pop_front().or_else(|| self.normal.pop_front())
    }

    /// Promote normal tasks that have waited longer than `threshold`
    ///
    /// Normal entries sit in admission order, so the aged ones form a
    /// prefix. They move to the priority tail in their original order.
    /// Returns how many were promoted.
    pub fn age_sweep(&mut self, now: Instant, threshold: Duration) -> usize {
        let mut promoted = 0;
        while self
            .normal
            .front()
            .is_some_and(|t| now.duration_since(t.queued_at) > threshold)
        {
            if let Some(mut task) = self.normal.pop_front() {
                task.record.is_priority = true;
                self.priority.push_back(task);
                promoted += 1;
            }
        }
        promoted
    }

    /// 1-based wait position of a task, or None when not resident
    pub fn position_of(&self, id: TaskId) -> Option<QueuePosition> {
        if let Some(idx) = self.priority.iter().position(|t| t.id() == id) {
            return Some(QueuePosition {
                position: idx + 1,
                queue: QueueKind::Priority,
            });
        }
        self.normal.iter().position(|t| t.id() == id).map(|idx| QueuePosition {
            position: self.priority.len() + idx + 1,
            queue: QueueKind::Normal,
        })
    }

    /// First instant at which the oldest normal task will be past the
    /// age threshold, if any normal tasks are waiting
    pub fn next_age_deadline(&self, threshold: Duration) -> Option<Instant> {
        // Promotion requires strictly exceeding the threshold, so the
        // deadline lands one tick beyond it
        self.normal
            .front()
            .map(|t| t.queued_at + threshold + Duration::from_millis(1))
    }

    pub fn priority_len(&self) -> usize {
        self.priority.len()
    }

    pub fn normal_len(&self) -> usize {
        self.normal.len()
    }

    pub fn total_len(&self) -> usize {
        self.priority.len() + self.normal.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::work_fn;
    use serde_json::json;

    fn task(is_priority: bool, label: &str) -> QueuedTask {
        QueuedTask::new(work_fn(|| async { Ok(()) }), is_priority, json!({ "label": label }))
    }

    fn label(task: &QueuedTask) -> String {
        task.record.metadata["label"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn test_normal_is_fifo() {
        let mut queues = TaskQueues::new();
        queues.push(task(false, "a"));
        queues.push(task(false, "b"));

        assert_eq!(label(&queues.pop_next().unwrap()), "a");
        assert_eq!(label(&queues.pop_next().unwrap()), "b");
        assert!(queues.pop_next().is_none());
    }

    #[tokio::test]
    async fn test_urgent_submissions_jump_to_front() {
        let mut queues = TaskQueues::new();
        queues.push(task(true, "first-urgent"));
        queues.push(task(true, "second-urgent"));

        // Most recent urgent work dispatches first
        assert_eq!(label(&queues.pop_next().unwrap()), "second-urgent");
        assert_eq!(label(&queues.pop_next().unwrap()), "first-urgent");
    }

    #[tokio::test]
    async fn test_priority_drains_before_normal() {
        let mut queues = TaskQueues::new();
        queues.push(task(false, "normal"));
        queues.push(task(true, "urgent"));

        assert_eq!(label(&queues.pop_next().unwrap()), "urgent");
        assert_eq!(label(&queues.pop_next().unwrap()), "normal");
    }

    #[tokio::test]
    async fn test_age_sweep_promotes_to_tail_in_order() {
        let mut queues = TaskQueues::new();
        let threshold = Duration::from_millis(5000);

        queues.push(task(true, "urgent"));
        queues.push(task(false, "old-1"));
        queues.push(task(false, "old-2"));

        let later = Instant::now() + Duration::from_millis(5001);
        let promoted = queues.age_sweep(later, threshold);

        assert_eq!(promoted, 2);
        assert_eq!(queues.priority_len(), 3);
        assert_eq!(queues.normal_len(), 0);

        // Urgent work stays ahead; aged tasks keep their relative order
        assert_eq!(label(&queues.pop_next().unwrap()), "urgent");
        let next = queues.pop_next().unwrap();
        assert_eq!(label(&next), "old-1");
        assert!(next.record.is_priority);
        assert_eq!(label(&queues.pop_next().unwrap()), "old-2");
    }

    #[tokio::test]
    async fn test_age_sweep_respects_threshold_strictly() {
        let mut queues = TaskQueues::new();
        let threshold = Duration::from_millis(5000);
        queues.push(task(false, "waiting"));

        let at_threshold = queues.normal.front().unwrap().queued_at + threshold;
        assert_eq!(queues.age_sweep(at_threshold, threshold), 0);

        let past_threshold = at_threshold + Duration::from_millis(1);
        assert_eq!(queues.age_sweep(past_threshold, threshold), 1);
    }

    #[tokio::test]
    async fn test_position_counts_priority_ahead_of_normal() {
        let mut queues = TaskQueues::new();
        let urgent = task(true, "urgent");
        let first = task(false, "first");
        let second = task(false, "second");
        let urgent_id = urgent.id();
        let first_id = first.id();
        let second_id = second.id();

        queues.push(first);
        queues.push(second);
        queues.push(urgent);

        assert_eq!(
            queues.position_of(urgent_id),
            Some(QueuePosition {
                position: 1,
                queue: QueueKind::Priority
            })
        );
        assert_eq!(
            queues.position_of(first_id),
            Some(QueuePosition {
                position: 2,
                queue: QueueKind::Normal
            })
        );
        assert_eq!(
            queues.position_of(second_id),
            Some(QueuePosition {
                position: 3,
                queue: QueueKind::Normal
            })
        );
    }

    #[tokio::test]
    async fn test_position_none_once_popped() {
        let mut queues = TaskQueues::new();
        let t = task(false, "only");
        let id = t.id();
        queues.push(t);

        assert!(queues.position_of(id).is_some());
        queues.pop_next();
        assert!(queues.position_of(id).is_none());
    }

    #[tokio::test]
    async fn test_next_age_deadline_tracks_oldest_normal() {
        let mut queues = TaskQueues::new();
        let threshold = Duration::from_millis(5000);

        assert!(queues.next_age_deadline(threshold).is_none());

        let t = task(false, "a");
        let queued_at = t.queued_at;
        queues.push(t);
        queues.push(task(true, "urgent"));

        let deadline = queues.next_age_deadline(threshold).unwrap();
        assert_eq!(deadline, queued_at + threshold + Duration::from_millis(1));
    }
}
