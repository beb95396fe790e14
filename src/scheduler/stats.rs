//! Latency and outcome accounting

/// Weight kept from the previous average on each new sample
const EMA_RETAIN: f64 = 0.8;

/// Weight given to the newest latency sample
const EMA_SAMPLE: f64 = 0.2;

/// Running totals the queue exposes through status snapshots
#[derive(Debug, Default, Clone)]
pub struct QueueStats {
    avg_processing_ms: Option<f64>,
    total_processed: u64,
    total_failed: u64,
}

impl QueueStats {
    /// Fold a successful completion into the totals
    ///
    /// The first sample becomes the average as-is; later samples blend
    /// in with exponential smoothing.
    pub fn record_success(&mut self, latency_ms: f64) {
        self.avg_processing_ms = Some(match self.avg_processing_ms {
            None => latency_ms,
            Some(avg) => avg * EMA_RETAIN + latency_ms * EMA_SAMPLE,
        });
        self.total_processed += 1;
    }

    /// Count a failure; rate-limit and terminal failures both land here
    pub fn record_failure(&mut self) {
        self.total_failed += 1;
    }

    pub fn avg_processing_ms(&self) -> Option<f64> {
        self.avg_processing_ms
    }

    pub fn total_processed(&self) -> u64 {
        self.total_processed
    }

    pub fn total_failed(&self) -> u64 {
        self.total_failed
    }

    /// Failures per successful completion, as a percentage
    ///
    /// Zero until at least one task has been processed.
    pub fn failure_rate(&self) -> f64 {
        if self.total_processed == 0 {
            return 0.0;
        }
        self.total_failed as f64 / self.total_processed as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_taken_raw() {
        let mut stats = QueueStats::default();
        assert!(stats.avg_processing_ms().is_none());

        stats.record_success(250.0);
        assert_eq!(stats.avg_processing_ms(), Some(250.0));
        assert_eq!(stats.total_processed(), 1);
    }

    #[test]
    fn test_ema_smoothing() {
        let mut stats = QueueStats::default();
        stats.record_success(100.0);
        stats.record_success(200.0);

        // 0.8 * 100 + 0.2 * 200
        let avg = stats.avg_processing_ms().unwrap();
        assert!((avg - 120.0).abs() < 1e-9);

        stats.record_success(120.0);
        let avg = stats.avg_processing_ms().unwrap();
        assert!((avg - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_failure_rate_zero_when_nothing_processed() {
        let mut stats = QueueStats::default();
        stats.record_failure();
        stats.record_failure();

        assert_eq!(stats.failure_rate(), 0.0);
        assert_eq!(stats.total_failed(), 2);
    }

    #[test]
    fn test_failure_rate_percentage() {
        let mut stats = QueueStats::default();
        stats.record_success(100.0);
        stats.record_success(100.0);
        stats.record_failure();

        assert!((stats.failure_rate() - 50.0).abs() < 1e-9);
    }
}
