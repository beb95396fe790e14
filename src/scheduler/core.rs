//! Queue manager implementation

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, Notify, broadcast};
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, error, info, warn};

use crate::config::QueueConfig;
use crate::domain::{QueuedTask, TaskId, Work, WorkError};
use crate::events::{EventBus, QueueEvent, QueueStatus};

use super::cooldown::CooldownController;
use super::queues::{QueuePosition, TaskQueues};
use super::stats::QueueStats;

/// Bookkeeping behind the manager's single lock
struct ManagerInner {
    queues: TaskQueues,

    /// Tasks currently executing
    active: usize,

    cooldown: CooldownController,
    stats: QueueStats,
    shutting_down: bool,
}

/// Admission control for bursty work against a rate-limited upstream
///
/// Callers hand work in through [`submit`](Self::submit) and get a task
/// id back immediately. A background dispatcher drains the queues
/// subject to the concurrency cap, the priority/normal split with
/// aging, and the adaptive cooldown. Every state change lands on the
/// event stream available through [`subscribe`](Self::subscribe).
///
/// The dispatcher holds a reference to the manager, so the manager
/// stays alive until [`shutdown`](Self::shutdown) is called.
pub struct QueueManager {
    config: QueueConfig,
    inner: Mutex<ManagerInner>,
    notify: Notify,
    events: EventBus,
}

impl QueueManager {
    /// Create a manager and start its dispatcher
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: QueueConfig) -> Arc<Self> {
        debug!(?config, "QueueManager::new: called");
        let events = EventBus::new(config.event_capacity);
        let manager = Arc::new(Self {
            inner: Mutex::new(ManagerInner {
                queues: TaskQueues::new(),
                active: 0,
                cooldown: CooldownController::new(config.initial_cooldown_ms),
                stats: QueueStats::default(),
                shutting_down: false,
            }),
            notify: Notify::new(),
            events,
            config,
        });

        let dispatcher = Arc::clone(&manager);
        tokio::spawn(dispatcher.run_dispatcher());

        manager
    }

    /// Admit work; returns the task id immediately
    ///
    /// Priority work jumps ahead of everything already waiting; normal
    /// work joins the back of the line but is promoted once it waits
    /// past the age threshold. Admission never fails and never blocks
    /// on the upstream.
    ///
    /// A task whose work reports a rate-limit error is re-admitted
    /// automatically as priority work, with no retry cap; the growing
    /// cooldown is the only throttle on a persistently limited
    /// upstream.
    pub async fn submit(&self, work: Arc<dyn Work>, priority: bool, metadata: serde_json::Value) -> TaskId {
        let task = QueuedTask::new(work, priority, metadata);
        let id = task.id();
        debug!(%id, priority, "QueueManager::submit: called");

        let mut inner = self.inner.lock().await;
        inner.queues.push(task);
        let status = self.snapshot(&inner);
        drop(inner);

        self.events.emit(QueueEvent::StatusChanged { status });
        self.notify.notify_one();
        id
    }

    /// 1-based wait position of a task, or None once it left the queues
    ///
    /// Executing and finished tasks report None; they are visible
    /// through [`status`](Self::status) and the event stream instead.
    pub async fn queue_position(&self, id: TaskId) -> Option<QueuePosition> {
        debug!(%id, "QueueManager::queue_position: called");
        let inner = self.inner.lock().await;
        inner.queues.position_of(id)
    }

    /// Rough wait estimate for newly submitted work
    ///
    /// Active work is assumed to take one average latency each, queued
    /// work an average latency divided across the concurrency slots,
    /// and an active cooldown adds its full value on top. Zero until
    /// the first completion establishes an average.
    pub async fn estimated_wait(&self) -> Duration {
        debug!("QueueManager::estimated_wait: called");
        let inner = self.inner.lock().await;

        let avg = inner.stats.avg_processing_ms().unwrap_or(0.0);
        let mut wait_ms = inner.active as f64 * avg
            + inner.queues.total_len() as f64 * avg / self.config.max_concurrent as f64;
        if inner.cooldown.in_cooldown(Instant::now()) {
            wait_ms += inner.cooldown.cooldown_ms() as f64;
        }

        Duration::from_millis(wait_ms as u64)
    }

    /// Point-in-time snapshot of queue health
    pub async fn status(&self) -> QueueStatus {
        debug!("QueueManager::status: called");
        let inner = self.inner.lock().await;
        self.snapshot(&inner)
    }

    /// Subscribe to the queue event stream
    ///
    /// Receivers get every event emitted after subscription; a slow
    /// receiver loses the oldest events rather than blocking the queue.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Stop the dispatcher
    ///
    /// In-flight work runs to completion; queued tasks stay where they
    /// are and are never dispatched.
    pub async fn shutdown(&self) {
        info!("QueueManager::shutdown: called");
        let mut inner = self.inner.lock().await;
        inner.shutting_down = true;
        drop(inner);
        self.notify.notify_one();
    }

    fn snapshot(&self, inner: &ManagerInner) -> QueueStatus {
        QueueStatus {
            active: inner.active,
            priority_queued: inner.queues.priority_len(),
            normal_queued: inner.queues.normal_len(),
            cooldown_ms: inner.cooldown.cooldown_ms(),
            in_cooldown: inner.cooldown.in_cooldown(Instant::now()),
            avg_processing_ms: inner.stats.avg_processing_ms(),
            total_processed: inner.stats.total_processed(),
            total_failed: inner.stats.total_failed(),
            failure_rate: inner.stats.failure_rate(),
        }
    }

    /// One pass over the queues
    ///
    /// Returns the tasks to start plus the instant the dispatcher
    /// should wake itself at, if any: the cooldown end while paused,
    /// otherwise the next aging deadline.
    fn dispatch_cycle(&self, inner: &mut ManagerInner) -> (Vec<QueuedTask>, Option<Instant>) {
        let now = Instant::now();

        if let Some(ends_at) = inner.cooldown.cooldown_ends_at(now) {
            debug!(
                cooldown_ms = inner.cooldown.cooldown_ms(),
                "QueueManager::dispatch_cycle: in cooldown, dispatch paused"
            );
            return (Vec::new(), Some(ends_at));
        }

        // Aging runs ahead of every dispatch decision, never on a timer
        // of its own
        let promoted = inner.queues.age_sweep(now, self.config.age_threshold());
        if promoted > 0 {
            info!(promoted, "QueueManager::dispatch_cycle: aged normal tasks into priority queue");
            self.events.emit(QueueEvent::TasksAged { count: promoted });
            self.events.emit(QueueEvent::StatusChanged {
                status: self.snapshot(inner),
            });
        }

        let mut started = Vec::new();
        while inner.active < self.config.max_concurrent {
            let Some(mut task) = inner.queues.pop_next() else {
                break;
            };
            inner.active += 1;
            task.record.started_at = Some(Utc::now());
            debug!(id = %task.id(), active = inner.active, "QueueManager::dispatch_cycle: dispatching");
            self.events.emit(QueueEvent::StatusChanged {
                status: self.snapshot(inner),
            });
            started.push(task);
        }

        (started, inner.queues.next_age_deadline(self.config.age_threshold()))
    }

    async fn run_dispatcher(self: Arc<Self>) {
        debug!("QueueManager::run_dispatcher: started");
        loop {
            let (started, wake_at) = {
                let mut inner = self.inner.lock().await;
                if inner.shutting_down {
                    break;
                }
                self.dispatch_cycle(&mut inner)
            };

            for task in started {
                let manager = Arc::clone(&self);
                tokio::spawn(manager.execute(task));
            }

            match wake_at {
                Some(deadline) => {
                    tokio::select! {
                        _ = self.notify.notified() => {}
                        _ = sleep_until(deadline) => {}
                    }
                }
                None => self.notify.notified().await,
            }
        }
        debug!("QueueManager::run_dispatcher: stopped");
    }

    async fn execute(self: Arc<Self>, mut task: QueuedTask) {
        debug!(id = %task.id(), "QueueManager::execute: running work");
        let started = Instant::now();

        // The work runs on its own task so a panic inside it surfaces
        // as a join error instead of taking the slot down with it
        let work = Arc::clone(&task.work);
        let outcome = match tokio::spawn(async move { work.run().await }).await {
            Ok(result) => result,
            Err(e) => {
                error!(id = %task.id(), error = %e, "QueueManager::execute: work task panicked");
                Err(WorkError::other("work task panicked"))
            }
        };
        let latency = started.elapsed();
        task.record.completed_at = Some(Utc::now());

        match outcome {
            Ok(()) => self.complete_success(task, latency).await,
            Err(err) if err.is_rate_limit() => {
                Arc::clone(&self).complete_rate_limited(task, err).await;
            }
            Err(err) => self.complete_failure(task, err).await,
        }

        self.notify.notify_one();
    }

    async fn complete_success(&self, task: QueuedTask, latency: Duration) {
        let latency_ms = latency.as_millis() as u64;
        debug!(id = %task.id(), latency_ms, "QueueManager::complete_success: called");

        let mut inner = self.inner.lock().await;
        inner.active -= 1;
        inner.stats.record_success(latency_ms as f64);
        let decayed = inner.cooldown.record_success(Instant::now());
        let cooldown_ms = inner.cooldown.cooldown_ms();
        let status = self.snapshot(&inner);
        drop(inner);

        self.events.emit(QueueEvent::TaskCompleted {
            task: task.record,
            latency_ms,
        });
        if decayed {
            info!(cooldown_ms, "QueueManager::complete_success: cooldown decayed");
            self.events.emit(QueueEvent::CooldownChanged { cooldown_ms });
        }
        self.events.emit(QueueEvent::StatusChanged { status });
    }

    async fn complete_failure(&self, task: QueuedTask, err: WorkError) {
        warn!(id = %task.id(), error = %err, "QueueManager::complete_failure: task failed");

        let mut inner = self.inner.lock().await;
        inner.active -= 1;
        inner.stats.record_failure();
        inner.cooldown.record_failure();
        let status = self.snapshot(&inner);
        drop(inner);

        self.events.emit(QueueEvent::TaskFailed {
            task: task.record,
            error: err.to_string(),
        });
        self.events.emit(QueueEvent::StatusChanged { status });
    }

    async fn complete_rate_limited(self: Arc<Self>, task: QueuedTask, err: WorkError) {
        warn!(id = %task.id(), error = %err, "QueueManager::complete_rate_limited: upstream pushed back");

        let mut inner = self.inner.lock().await;
        inner.active -= 1;
        inner.stats.record_failure();
        let grew = inner.cooldown.record_rate_limit(Instant::now());
        let cooldown_ms = inner.cooldown.cooldown_ms();
        let delay = inner.cooldown.retry_delay();
        debug!(
            cooldown_ms,
            streak = inner.cooldown.failure_streak(),
            "QueueManager::complete_rate_limited: backoff updated"
        );
        let status = self.snapshot(&inner);
        drop(inner);

        self.events.emit(QueueEvent::RateLimitHit { cooldown_ms });
        if grew {
            self.events.emit(QueueEvent::CooldownChanged { cooldown_ms });
        }
        self.events.emit(QueueEvent::StatusChanged { status });

        // Park the work and bring it back as urgent once the backoff
        // passes; the task re-enters as a brand new admission
        debug!(id = %task.id(), delay_ms = delay.as_millis() as u64, "QueueManager::complete_rate_limited: scheduling retry");
        let work = task.work;
        let metadata = task.record.metadata;
        tokio::spawn(async move {
            sleep(delay).await;
            let id = self.submit(work, true, metadata).await;
            debug!(%id, "QueueManager::complete_rate_limited: task re-admitted");
        });
    }
}
