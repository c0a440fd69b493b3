//! crates/drug_discovery_core/src/retry.rs
//!
//! Fixed-delay retry for a single outbound call.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// How many times to repeat a failed call and how long to wait in between.
///
/// The delay is constant: no backoff, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// 3 retries (4 attempts in total), one second apart.
    pub const VARIANT_INFO: RetryPolicy = RetryPolicy {
        max_retries: 3,
        delay: Duration::from_secs(1),
    };

    pub fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Runs `op` until it succeeds or the retries are used up, returning the last error.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.total_attempts() => {
                    warn!(
                        attempt,
                        max_attempts = self.total_attempts(),
                        "Attempt failed, retrying in {:?}: {}",
                        self.delay,
                        e
                    );
                    attempt += 1;
                    sleep(self.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
