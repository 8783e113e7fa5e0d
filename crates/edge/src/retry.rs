//! Caller-side retry policy for batch forwarding
//!
//! Exponential backoff: `initial`, `2 * initial`, ... capped at `max`.

use std::time::Duration;

use contracts::{BatchForwarder, ClassifiedReading, ContractError, ForwarderConfig, PersistedRecord};
use tracing::debug;

/// Retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ForwarderConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ForwarderConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
        }
    }

    /// Policy without retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before attempt `attempt + 1`, after `attempt` failures (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff)
    }
}

/// Result of forwarding one batch under a retry policy
#[derive(Debug)]
pub struct ForwardOutcome {
    pub attempts: u32,
    pub result: Result<Vec<PersistedRecord>, ContractError>,
}

/// Forward one batch, retrying failures per `policy`
///
/// The last error is returned once attempts are exhausted.
pub async fn forward_with_retry<F: BatchForwarder>(
    forwarder: &F,
    batch: &[ClassifiedReading],
    policy: &RetryPolicy,
) -> ForwardOutcome {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match forwarder.forward(batch).await {
            Ok(persisted) => {
                return ForwardOutcome {
                    attempts: attempt,
                    result: Ok(persisted),
                }
            }
            Err(e) if attempt >= policy.max_attempts => {
                return ForwardOutcome {
                    attempts: attempt,
                    result: Err(e),
                }
            }
            Err(e) => {
                let delay = policy.backoff(attempt);
                debug!(
                    forwarder = forwarder.name(),
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Forward attempt failed"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
