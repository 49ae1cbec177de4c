use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{BuilderError, Result};

/// Sleeps for `duration` unless the token is cancelled first.
pub(crate) async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        () = cancel.cancelled() => Err(BuilderError::Cancelled),
        () = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Bounded-time polling loop.
///
/// Each call to [`Waiter::tick`] fails with `TimeoutExceeded` once the
/// deadline has passed, otherwise sleeps one interval and hands back the
/// number of the upcoming check (0, 1, 2, ...). The caller runs its check
/// after every tick and leaves the loop when done; check errors propagate
/// with `?`.
///
/// ```ignore
/// let mut waiter = Waiter::new(interval, timeout, &cancel);
/// loop {
///     let count = waiter.tick().await?;
///     if check(count).await? {
///         break;
///     }
/// }
/// ```
pub struct Waiter<'a> {
    interval: Duration,
    /// `None` when the timeout reaches past what `Instant` can represent
    deadline: Option<Instant>,
    cancel: &'a CancellationToken,
    count: usize,
}

impl<'a> Waiter<'a> {
    pub fn new(interval: Duration, timeout: Duration, cancel: &'a CancellationToken) -> Self {
        Self {
            interval,
            deadline: Instant::now().checked_add(timeout),
            cancel,
            count: 0,
        }
    }

    pub async fn tick(&mut self) -> Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(BuilderError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() > deadline) {
            return Err(BuilderError::TimeoutExceeded);
        }
        pause(self.interval, self.cancel).await?;

        let count = self.count;
        self.count += 1;
        Ok(count)
    }
}

/// True on the ticks where progress should be logged.
pub(crate) fn should_report(count: usize, every: usize) -> bool {
    every == 0 || count % every == 0
}
