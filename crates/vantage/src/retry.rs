//! Bounded retries with jittered exponential backoff.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    /// Relative jitter applied to every delay, 0.2 means ±20%
    pub jitter: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_backoff: Duration::from_millis(500),
            multiplier: 1.5,
            jitter: 0.2,
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Delay before retry number `attempt`, counted from zero
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let jitter = if self.jitter > 0.0 {
            rand::thread_rng().gen_range(-self.jitter..=self.jitter)
        } else {
            0.0
        };
        let delay = (base * (1.0 + jitter)).max(0.0);
        Duration::from_secs_f64(delay).min(self.max_backoff)
    }

    /// Run `operation` until `should_retry` declines its outcome or the
    /// retries are used up; the last outcome is returned as is.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F, should_retry: impl Fn(&Result<T, E>) -> bool) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            let outcome = operation().await;
            if attempt >= self.max_retries || !should_retry(&outcome) {
                return outcome;
            }

            let delay = self.backoff(attempt);
            debug!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "Retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
