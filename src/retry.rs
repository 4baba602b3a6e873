// src/retry.rs
//! Bounded retry wrapper shared by translation, language validation and media download.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `base * 2^(n-1)` before retry n.
    Exponential(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

/// What one attempt produced.
#[derive(Debug)]
pub enum Attempt<T> {
    Done(T),
    /// Worth another try, if attempts remain.
    Retry,
    /// Give up now.
    Abort,
}

impl RetryPolicy {
    pub const fn exponential(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential(base),
        }
    }

    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    /// Delay slept after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(d) => d,
            Backoff::Exponential(base) => {
                let shift = attempt.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << shift)
            }
        }
    }

    /// Run `op` until it returns `Done`, `Abort`, or attempts run out.
    /// `op` receives the 1-based attempt number. No sleep follows the last attempt.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Option<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let attempts = self.max_attempts.max(1);
        for attempt in 1..=attempts {
            match op(attempt).await {
                Attempt::Done(v) => return Some(v),
                Attempt::Abort => return None,
                Attempt::Retry if attempt < attempts => {
                    let delay = self.delay_after(attempt);
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Attempt::Retry => {}
            }
        }
        None
    }
}
