//! Exponential backoff for transient store failures.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    /// Each delay is drawn from `interval * [1 - factor, 1 + factor]`
    pub randomization_factor: f64,
    pub max_interval: Duration,
    /// Give up once the next sleep would take the total past this
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            multiplier: 1.5,
            randomization_factor: 0.5,
            max_interval: Duration::from_secs(60),
            max_elapsed: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_elapsed(max_elapsed: Duration) -> Self {
        Self {
            max_elapsed,
            ..Self::default()
        }
    }

    /// A policy that never sleeps; the first failure is returned as-is.
    pub fn no_retry() -> Self {
        Self {
            max_elapsed: Duration::ZERO,
            ..Self::default()
        }
    }

    fn next_interval(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier).min(self.max_interval)
    }

    fn jittered(&self, interval: Duration) -> Duration {
        let unit: f64 = rand::thread_rng().gen_range(0.0..=1.0);
        randomized_interval(interval, self.randomization_factor, unit)
    }
}

/// Maps `unit` in `[0, 1]` onto `[interval * (1 - factor), interval * (1 + factor)]`.
pub fn randomized_interval(interval: Duration, factor: f64, unit: f64) -> Duration {
    let delta = interval.as_secs_f64() * factor;
    let low = interval.as_secs_f64() - delta;
    Duration::from_secs_f64((low + unit.clamp(0.0, 1.0) * 2.0 * delta).max(0.0))
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or the
/// policy's elapsed budget is spent.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &'static str,
    mut operation: F,
    is_transient: fn(&E) -> bool,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let started = Instant::now();
    let mut interval = policy.initial_interval;
    let mut attempt: u32 = 1;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_transient(&err) {
            return Err(err);
        }

        let delay = policy.jittered(interval);
        if started.elapsed() + delay > policy.max_elapsed {
            return Err(err);
        }

        warn!(
            operation = operation_name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "transient storage failure, retrying"
        );
        tokio::time::sleep(delay).await;

        interval = policy.next_interval(interval);
        attempt += 1;
    }
}
