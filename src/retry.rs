// src/retry.rs
use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;

/// Bounded retry with exponential backoff: `max_attempts` tries in total,
/// waits doubling from `base_delay` up to `max_delay` between them.
///
/// Both the source fetch and the webhook delivery reuse this, each with its
/// own instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u8, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Whether another try is allowed after `attempt` tries have failed.
    pub fn should_retry(&self, attempt: u8) -> bool {
        attempt < self.max_attempts
    }

    /// Backoff before the retry following the failed `attempt` (1-based):
    /// attempt 1 waits `base_delay`, attempt 2 twice that, capped at
    /// `max_delay`.
    pub fn delay_for(&self, attempt: u8) -> Duration {
        let exp = u32::from(attempt.saturating_sub(1)).min(30);
        self.base_delay.saturating_mul(1u32 << exp).min(self.max_delay)
    }
}

/// Run `op` under `policy`, sleeping the backoff between failed tries.
/// Returns the last error once attempts are exhausted.
///
/// With a `cancel` receiver, a backoff sleep is raced against the signal:
/// cancellation abandons the remaining attempts within one backoff step and
/// surfaces the last error. The try in flight is always allowed to finish.
pub async fn retry_async<T, F, Fut>(
    policy: RetryPolicy,
    what: &str,
    mut cancel: Option<watch::Receiver<bool>>,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u8 = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if !policy.should_retry(attempt) {
                    return Err(e);
                }
                let wait = policy.delay_for(attempt);
                tracing::warn!(
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    error = ?e,
                    "{what} failed, backing off"
                );
                if !sleep_or_cancel(cancel.as_mut(), wait).await {
                    tracing::info!("{what} cancelled during backoff, giving up");
                    return Err(e).context("cancelled during retry backoff");
                }
            }
        }
    }
}

/// Sleep `wait`, or return false early if cancellation is (or becomes)
/// signalled. A dropped sender counts as cancellation.
async fn sleep_or_cancel(cancel: Option<&mut watch::Receiver<bool>>, wait: Duration) -> bool {
    let Some(rx) = cancel else {
        tokio::time::sleep(wait).await;
        return true;
    };
    if *rx.borrow() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(wait) => true,
        res = rx.changed() => res.is_ok() && !*rx.borrow(),
    }
}
