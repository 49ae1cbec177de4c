use std::future::Future;

use log::warn;
use tokio_util::sync::CancellationToken;

use super::waiter::pause;
use crate::config::RetryConfig;
use crate::error::{BuilderError, Result};

/// Runs `call` up to `policy.attempts` times with a constant delay between
/// attempts.
///
/// Every failed attempt is logged with `operation` and `target`. The first
/// success is returned right away; once attempts are exhausted the last
/// error is returned. Cancellation is checked before every attempt and
/// during the delay, never while a call is in flight.
pub async fn retry<T, F, Fut>(
    policy: &RetryConfig,
    cancel: &CancellationToken,
    operation: &str,
    target: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        if cancel.is_cancelled() {
            return Err(BuilderError::Cancelled);
        }

        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => {
                warn!("{operation} failed, {target} -> {e} (giving up after {attempts} attempts)");
                return Err(e);
            }
            Err(e) => {
                warn!(
                    "{operation} failed, {target} -> {e}, retrying in {}s ({attempt}/{attempts})...",
                    policy.interval_secs
                );
            }
        }

        pause(policy.interval(), cancel).await?;
        attempt += 1;
    }
}
