//! Bounded-attempt retry with a recovery action between attempts.
//!
//! The crawler wraps two fallible stages with this combinator: loading a list
//! page and processing the whole batch of article links found on it. A failed
//! attempt runs the caller's recovery action (reload the list, navigate back)
//! and sleeps for a fixed delay before the operation starts over from the
//! beginning.
//!
//! # Retry Strategy
//!
//! - 10 attempts in total by default
//! - Fixed 5 second delay, no backoff growth and no jitter
//! - Errors that report `is_retryable() == false` propagate immediately
//! - On exhaustion the last error is returned unchanged

use std::fmt::Display;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Classifies whether an error may be re-attempted.
pub trait Retryable: Display {
    fn is_retryable(&self) -> bool {
        true
    }
}

/// Attempt ceiling and fixed delay for [`retry`] and [`retry_with_recovery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: usize,
    /// Pause between a failed attempt and the next one.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(5))
    }
}

/// Run `op` under `policy` without any recovery action.
pub async fn retry<T, E, Op>(policy: &RetryPolicy, label: &str, op: Op) -> Result<T, E>
where
    Op: AsyncFnMut() -> Result<T, E>,
    E: Retryable,
{
    retry_with_recovery(policy, label, op, async || Ok(())).await
}

/// Run `op` under `policy`, calling `recover` after every failed attempt.
///
/// Each attempt re-runs `op` from its start. A failing recovery action is
/// logged and counted against nothing; the next attempt proceeds anyway and
/// will surface the underlying problem itself.
#[instrument(level = "debug", skip_all, fields(%label))]
pub async fn retry_with_recovery<T, E, Op, Rec>(
    policy: &RetryPolicy,
    label: &str,
    mut op: Op,
    mut recover: Rec,
) -> Result<T, E>
where
    Op: AsyncFnMut() -> Result<T, E>,
    Rec: AsyncFnMut() -> Result<(), E>,
    E: Retryable,
{
    let total_t0 = Instant::now();
    let mut attempt = 0usize;

    loop {
        attempt += 1;
        let attempt_t0 = Instant::now();
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => {
                error!(attempt, error = %e, "{label} failed with a non-retryable error");
                return Err(e);
            }
            Err(e) => {
                let elapsed_ms_attempt = attempt_t0.elapsed().as_millis();
                let elapsed_ms_total = total_t0.elapsed().as_millis();

                if attempt >= policy.max_attempts {
                    error!(
                        attempt,
                        max = policy.max_attempts,
                        elapsed_ms_attempt,
                        elapsed_ms_total,
                        error = %e,
                        "{label} exhausted retries"
                    );
                    return Err(e);
                }

                warn!(
                    attempt,
                    max = policy.max_attempts,
                    elapsed_ms_attempt,
                    elapsed_ms_total,
                    delay = ?policy.delay,
                    error = %e,
                    "{label} attempt failed; retrying"
                );

                if let Err(re) = recover().await {
                    warn!(attempt, error = %re, "{label} recovery action failed");
                }
                sleep(policy.delay).await;
            }
        }
    }
}
