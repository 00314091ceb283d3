use std::future::Future;
use std::time::Duration;

use rand::Rng as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::StudioError;

/// Delay growth between attempts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay before every retry.
    #[default]
    Fixed,
    /// `base_delay * factor^retries`, capped at `max_delay_ms`, optionally with
    /// full jitter.
    Exponential {
        factor: f64,
        max_delay_ms: u64,
        #[serde(default)]
        jitter: bool,
    },
}

/// Bounded retry policy for transient backend errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. `0` behaves like `1`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default)]
    pub backoff: Backoff,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    500
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(default_max_attempts(), default_base_delay_ms())
    }
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            backoff: Backoff::Fixed,
        }
    }

    /// Single attempt, no retries.
    pub const fn none() -> Self {
        Self::fixed(1, 0)
    }

    pub fn exponential(max_attempts: u32, base_delay_ms: u64, factor: f64) -> Self {
        let factor = if factor <= 0.0 { 2.0 } else { factor };
        Self {
            max_attempts,
            base_delay_ms,
            backoff: Backoff::Exponential {
                factor,
                max_delay_ms: 30_000,
                jitter: false,
            },
        }
    }

    pub fn with_jitter(mut self) -> Self {
        if let Backoff::Exponential { jitter, .. } = &mut self.backoff {
            *jitter = true;
        }
        self
    }

    pub fn with_max_delay_ms(mut self, max: u64) -> Self {
        if let Backoff::Exponential { max_delay_ms, .. } = &mut self.backoff {
            *max_delay_ms = max.max(1);
        }
        self
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn can_retry(&self, attempts_done: u32) -> bool {
        attempts_done < self.attempts()
    }

    /// Delay before the retry that follows `retries_done` earlier retries.
    pub fn delay_for(&self, retries_done: u32) -> Duration {
        match &self.backoff {
            Backoff::Fixed => Duration::from_millis(self.base_delay_ms),
            Backoff::Exponential {
                factor,
                max_delay_ms,
                jitter,
            } => {
                let exp = factor.powi(retries_done.min(i32::MAX as u32) as i32);
                let raw = (self.base_delay_ms as f64 * exp).round();
                let capped = if raw.is_finite() {
                    (raw as u64).min(*max_delay_ms)
                } else {
                    *max_delay_ms
                };
                let millis = if *jitter && capped > 0 {
                    rand::rng().random_range(0..=capped)
                } else {
                    capped
                };
                Duration::from_millis(millis)
            }
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// policy's attempt budget is used up. The last error is returned unchanged.
///
/// `op` receives the 1-based attempt number.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, StudioError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, StudioError>>,
{
    let mut attempt = 1u32;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retryable = err.is_transient();
                let can_retry = retryable && policy.can_retry(attempt);
                debug!(
                    event = "retry.attempt_failed",
                    domain = "retry",
                    attempt = attempt,
                    max_attempts = policy.attempts(),
                    retryable = retryable,
                    can_retry = can_retry,
                    error = %err
                );
                if !can_retry {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt - 1);
                info!(
                    event = "retry.scheduled",
                    domain = "retry",
                    attempt = attempt,
                    next_attempt = attempt + 1,
                    backoff_ms = delay.as_millis() as u64
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
