//! Adaptive cooldown control
//!
//! Rate-limit failures pause dispatch entirely and grow the pause
//! multiplicatively; sustained success after a quiet period decays it
//! back down. All arithmetic floors to whole milliseconds.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

/// Smallest value the cooldown can decay to, in milliseconds
pub const MIN_COOLDOWN_MS: u64 = 1_000;

/// Largest value the cooldown can grow to, in milliseconds
pub const MAX_COOLDOWN_MS: u64 = 30_000;

/// Gap between rate-limit failures beyond which the streak restarts
const STREAK_RESET_WINDOW: Duration = Duration::from_secs(10);

/// Failure-free time required before successes may decay the cooldown
const DECAY_QUIET_WINDOW: Duration = Duration::from_secs(15);

/// Consecutive successes required before decay kicks in
const DECAY_MIN_SUCCESSES: u32 = 3;

/// Failure streak at which growth switches to the steeper factor
const STEEP_GROWTH_STREAK: u32 = 5;

const GROWTH_FACTOR: f64 = 1.5;
const STEEP_GROWTH_FACTOR: f64 = 2.0;
const DECAY_FACTOR: f64 = 0.9;

/// Cap on the retry backoff, independent of cooldown growth
const MAX_RETRY_DELAY_MS: u64 = 10_000;

/// Upper bound (exclusive) on retry jitter
const RETRY_JITTER_MS: u64 = 1_000;

/// Tracks rate-limit pressure and derives the dispatch pause from it
#[derive(Debug)]
pub struct CooldownController {
    cooldown_ms: u64,
    failure_streak: u32,
    success_streak: u32,
    last_failure_at: Option<Instant>,
}

impl CooldownController {
    /// Create a controller; the initial value is clamped into bounds
    pub fn new(initial_ms: u64) -> Self {
        Self {
            cooldown_ms: initial_ms.clamp(MIN_COOLDOWN_MS, MAX_COOLDOWN_MS),
            failure_streak: 0,
            success_streak: 0,
            last_failure_at: None,
        }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    pub fn failure_streak(&self) -> u32 {
        self.failure_streak
    }

    /// Whether dispatch is paused at `now`
    ///
    /// True only while a rate-limit failure is recent: strictly less
    /// than one cooldown has elapsed since it.
    pub fn in_cooldown(&self, now: Instant) -> bool {
        if self.failure_streak == 0 {
            return false;
        }
        match self.last_failure_at {
            Some(at) => now.duration_since(at) < self.cooldown(),
            None => false,
        }
    }

    /// When the active cooldown window ends, if one is active
    pub fn cooldown_ends_at(&self, now: Instant) -> Option<Instant> {
        if !self.in_cooldown(now) {
            return None;
        }
        self.last_failure_at.map(|at| at + self.cooldown())
    }

    /// Register a rate-limit failure
    ///
    /// Grows the cooldown on every call: by 1.5x while the failure
    /// streak is short, by 2x once it reaches five, capped at the
    /// maximum. A gap longer than the reset window starts a new streak.
    /// Returns true when the cooldown value actually changed.
    pub fn record_rate_limit(&mut self, now: Instant) -> bool {
        if let Some(at) = self.last_failure_at {
            if now.duration_since(at) > STREAK_RESET_WINDOW {
                self.failure_streak = 0;
            }
        }
        self.failure_streak += 1;
        self.success_streak = 0;
        self.last_failure_at = Some(now);

        let factor = if self.failure_streak < STEEP_GROWTH_STREAK {
            GROWTH_FACTOR
        } else {
            STEEP_GROWTH_FACTOR
        };
        let grown = (self.cooldown_ms as f64 * factor) as u64;
        let next = grown.min(MAX_COOLDOWN_MS);
        let changed = next != self.cooldown_ms;
        self.cooldown_ms = next;
        changed
    }

    /// Register a terminal (non-rate-limit) failure
    ///
    /// Breaks the success streak; the cooldown itself only reacts to
    /// rate-limit pressure.
    pub fn record_failure(&mut self) {
        self.success_streak = 0;
    }

    /// Register a success
    ///
    /// Once three consecutive successes have accumulated and the last
    /// rate-limit failure is more than the quiet window ago, each
    /// success decays the cooldown by 10%, floored at the minimum.
    /// Returns true when the cooldown value actually changed.
    pub fn record_success(&mut self, now: Instant) -> bool {
        self.success_streak += 1;
        if self.success_streak < DECAY_MIN_SUCCESSES {
            return false;
        }

        let quiet = match self.last_failure_at {
            Some(at) => now.duration_since(at) > DECAY_QUIET_WINDOW,
            None => true,
        };
        if !quiet {
            return false;
        }

        let decayed = (self.cooldown_ms as f64 * DECAY_FACTOR) as u64;
        let next = decayed.max(MIN_COOLDOWN_MS);
        let changed = next != self.cooldown_ms;
        self.cooldown_ms = next;
        changed
    }

    /// Delay before a rate-limited task is re-admitted
    ///
    /// Bounded by ten seconds no matter how far the cooldown has
    /// grown, plus up to a second of jitter to spread retries out.
    pub fn retry_delay(&self) -> Duration {
        let base = self.cooldown_ms.min(MAX_RETRY_DELAY_MS);
        let jitter = rand::rng().random_range(0..RETRY_JITTER_MS);
        Duration::from_millis(base + jitter)
    }
}
