//! Timeout enforcement for outbound calls.
//!
//! Every call into the relay target runs under a deadline so a stalled
//! upstream fails the caller instead of pinning the dispatch worker.

use std::future::Future;
use std::time::Duration;

/// Raised when a wrapped call outlives its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded(pub Duration);

/// Run `fut` with a deadline, converting expiry into the caller's error type.
pub async fn with_deadline<F, T, E>(deadline: Duration, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<DeadlineExceeded>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(DeadlineExceeded(deadline).into()),
    }
}
