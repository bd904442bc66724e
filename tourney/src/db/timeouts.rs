//! Deadlines and cancellation for storage calls
//!
//! Every store call made by the managers goes through [`guarded`], which races
//! the call against the request's timeout and cancellation token.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::errors::{StoreError, StoreResult};

/// Default timeout for store calls (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-request deadline and cancellation handle
#[derive(Debug, Clone)]
pub struct RequestContext {
    timeout: Duration,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Context bound to an externally owned cancellation token
    pub fn with_token(timeout: Duration, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }

    /// Same deadline, fresh token
    ///
    /// Compensating writes run under a detached context so that cancelling the
    /// request cannot leave a half-applied transition behind.
    pub fn detached(&self) -> Self {
        Self::new(self.timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_TIMEOUT)
    }
}

/// Run a store call under the context's deadline and cancellation token
pub async fn guarded<F, T>(ctx: &RequestContext, future: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    if ctx.is_cancelled() {
        return Err(StoreError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => Err(StoreError::Cancelled),
        result = timeout(ctx.timeout, future) => match result {
            Ok(inner) => inner,
            Err(_) => Err(StoreError::Timeout(ctx.timeout)),
        },
    }
}
