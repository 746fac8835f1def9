//! Linear-backoff retry for a busy backend.
//!
//! `Attempting(n)` runs attempt `n` (1-indexed). A busy failure with attempts
//! left moves to `Backoff(n)`, which waits `n × backoff_unit` and moves to
//! `Attempting(n + 1)`. Success ends in `Succeeded`; any other failure, or a
//! busy failure on the last attempt, ends in `Failed`.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use scholar_core::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting(u32),
    Backoff(u32),
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self { Self { max_attempts: 3, backoff_unit: Duration::from_secs(2) } }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self { Self { max_attempts: max_attempts.max(1), backoff_unit } }

    pub fn backoff(&self, attempt: u32) -> Duration { self.backoff_unit * attempt }

    /// State following the outcome of attempt `attempt`.
    pub fn transition<T>(&self, attempt: u32, outcome: &Result<T>) -> RetryState {
        match outcome {
            Ok(_) => RetryState::Succeeded,
            Err(e) if e.is_busy() && attempt < self.max_attempts => RetryState::Backoff(attempt),
            Err(_) => RetryState::Failed,
        }
    }

    /// Error reported when attempt `attempt` is the last one. Busy failures
    /// become `RetryExhausted`, everything else passes through.
    fn terminal_error(&self, attempt: u32, err: Error) -> Error {
        if err.is_busy() { Error::RetryExhausted { attempts: attempt } } else { err }
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) { tokio::time::sleep(duration).await }
}

/// Drive `attempt_fn` through the retry state machine. The outcome of the
/// attempt that reaches a terminal state is returned directly.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, sleeper: &dyn Sleeper, mut attempt_fn: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        let result = attempt_fn(attempt).await;
        match policy.transition(attempt, &result) {
            RetryState::Backoff(n) => {
                let wait = policy.backoff(n);
                tracing::warn!(attempt = n, wait_ms = wait.as_millis() as u64, "cluster busy, backing off");
                sleeper.sleep(wait).await;
                attempt = n + 1;
            }
            RetryState::Succeeded | RetryState::Failed | RetryState::Attempting(_) => {
                return result.map_err(|e| policy.terminal_error(attempt, e));
            }
        }
    }
}
