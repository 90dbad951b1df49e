// ABOUTME: Bounded polling: wait until an async predicate holds or a deadline passes.
// ABOUTME: Always makes one last check at the deadline before reporting a timeout.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};

#[derive(Error, Debug)]
pub enum WaitError<E> {
    #[error("condition not met within {timeout:?}")]
    TimedOut { timeout: Duration },

    #[error("condition check failed: {0}")]
    Check(#[source] E),
}

/// Poll `check` every `interval` until it returns `true` or `timeout` elapses.
///
/// A predicate that holds on the first call returns without sleeping. An
/// error from the predicate aborts the wait immediately.
pub async fn wait_until<F, Fut, E>(
    mut check: F,
    timeout: Duration,
    interval: Duration,
) -> Result<(), WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        if check().await.map_err(WaitError::Check)? {
            return Ok(());
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        sleep(interval.min(remaining)).await;
    }

    if check().await.map_err(WaitError::Check)? {
        return Ok(());
    }
    Err(WaitError::TimedOut { timeout })
}
