//! Work outcome errors

use thiserror::Error;

/// Errors a work function can report back to the queue
///
/// The queue only distinguishes rate-limit pushback from everything
/// else: rate-limited work is re-admitted after a backoff, any other
/// failure is counted and reported but not retried.
#[derive(Debug, Clone, Error)]
pub enum WorkError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("{0}")]
    Other(String),
}

impl WorkError {
    /// Build a rate-limit error
    pub fn rate_limited(message: impl Into<String>) -> Self {
        WorkError::RateLimited(message.into())
    }

    /// Build a terminal failure
    pub fn other(message: impl Into<String>) -> Self {
        WorkError::Other(message.into())
    }

    /// True for rate-limit pushback, false for terminal failures
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, WorkError::RateLimited(_))
    }
}
