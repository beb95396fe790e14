//! The work seam: what the queue actually dispatches

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::error::WorkError;

/// Outcome of one work invocation
pub type WorkResult = Result<(), WorkError>;

/// A unit of work the queue can dispatch
///
/// Implementations make the actual upstream call. The queue may invoke
/// `run` more than once for the same logical task: a rate-limited
/// attempt is re-admitted after a backoff and runs again. Work must be
/// safe to re-invoke.
///
/// A `run` future that never resolves holds its concurrency slot
/// indefinitely; the queue applies no execution timeout.
#[async_trait]
pub trait Work: Send + Sync {
    async fn run(&self) -> WorkResult;
}

/// Adapter that lets a plain async closure act as [`Work`]
pub struct FnWork<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Work for FnWork<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = WorkResult> + Send,
{
    async fn run(&self) -> WorkResult {
        (self.f)().await
    }
}

/// Wrap an async closure so it can be submitted to the queue
pub fn work_fn<F, Fut>(f: F) -> Arc<dyn Work>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = WorkResult> + Send + 'static,
{
    Arc::new(FnWork { f })
}
