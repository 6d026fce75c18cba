//! Bounded retries for reads.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::trait_::Result;

/// How many times a failed read is attempted again.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first
    pub max_retries: usize,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Run a read, retrying retryable failures up to `policy.max_retries` times.
///
/// Only for idempotent reads; writes go through once.
pub async fn with_read_retries<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries && e.is_retryable() => {
                attempt += 1;
                warn!("{} failed (attempt {}/{}): {}", what, attempt, policy.max_retries + 1, e);
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
}
