//! Queue configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tuning knobs for a [`QueueManager`](crate::QueueManager)
///
/// Every field has a default suitable for a low-volume upstream that
/// starts throttling around a handful of concurrent calls. All fields
/// are optional in config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum tasks executing at once
    #[serde(rename = "max-concurrent")]
    pub max_concurrent: usize,

    /// Queue time in milliseconds after which a normal task is
    /// promoted to the priority queue
    #[serde(rename = "age-threshold-ms")]
    pub age_threshold_ms: u64,

    /// Cooldown applied before any rate-limit failure has been seen,
    /// in milliseconds; clamped to the adaptive range on use
    #[serde(rename = "initial-cooldown-ms")]
    pub initial_cooldown_ms: u64,

    /// Events buffered for subscribers before the oldest are dropped
    #[serde(rename = "event-capacity")]
    pub event_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            age_threshold_ms: 5_000,
            initial_cooldown_ms: 3_000,
            event_capacity: 1_024,
        }
    }
}

impl QueueConfig {
    /// Reject values the queue cannot run with
    ///
    /// Called by the binary right after loading so bad files fail
    /// before a manager is constructed.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(eyre::eyre!("max-concurrent must be at least 1"));
        }
        if self.event_capacity == 0 {
            return Err(eyre::eyre!("event-capacity must be at least 1"));
        }
        Ok(())
    }

    /// Age threshold as a [`Duration`]
    pub fn age_threshold(&self) -> Duration {
        Duration::from_millis(self.age_threshold_ms)
    }

    /// Resolve the effective configuration
    ///
    /// An explicit path must load or the whole call fails. Without one,
    /// `./.liveq.yml` is tried first, then the user config directory,
    /// and an unreadable discovered file is skipped with a warning
    /// rather than aborting. Falls back to defaults.
    pub fn load(explicit: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()));
        }

        let mut candidates = vec![PathBuf::from(".liveq.yml")];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("liveq").join("liveq.yml"));
        }

        for candidate in candidates.iter().filter(|c| c.exists()) {
            match Self::load_from_file(candidate) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Skipping unreadable config {}: {}", candidate.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    pub(crate) fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).context("reading config file")?;
        let config: Self = serde_yaml::from_str(&raw).context("parsing config file")?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
