// Retry policy: which failure kinds are worth another attempt, and how long to wait

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use super::config::serde_secs;
use super::errors::{FetchError, FetchErrorKind};

/// What the policy table says about one failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryRule {
    pub retryable: bool,
    pub max_attempts: u32,
}

/// Bounded exponential backoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts for retryable kinds, first attempt included
    pub max_attempts: u32,
    #[serde(with = "serde_secs")]
    pub base_delay: Duration,
    #[serde(with = "serde_secs")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Policy table lookup
    pub fn rule_for(&self, kind: FetchErrorKind) -> RetryRule {
        let retryable = match kind {
            FetchErrorKind::RateLimited
            | FetchErrorKind::Transient
            | FetchErrorKind::Timeout
            | FetchErrorKind::ConnectionError => true,
            FetchErrorKind::HttpStatus(code) => (500..600).contains(&code),
            FetchErrorKind::InvalidInput
            | FetchErrorKind::NotFound
            | FetchErrorKind::Unsupported => false,
        };

        RetryRule {
            retryable,
            max_attempts: if retryable { self.max_attempts.max(1) } else { 1 },
        }
    }

    /// Delay before the next attempt, after `attempt` (1-based) failed
    pub fn backoff(&self, attempt: u32, kind: FetchErrorKind) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let mut delay = self.base_delay.saturating_mul(1u32 << exponent);
        if kind == FetchErrorKind::RateLimited {
            delay = delay.saturating_mul(2);
        }
        delay.min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable kind, or the
/// attempt ceiling for its kind is reached.
///
/// Returns the result together with the number of attempts made.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> (Result<T, FetchError>, u32)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return (Ok(value), attempt),
            Err(err) => {
                let rule = policy.rule_for(err.kind);
                if !rule.retryable || attempt >= rule.max_attempts {
                    debug!(
                        op = label,
                        attempt,
                        kind = %err.kind,
                        "Giving up: {}",
                        err.message
                    );
                    return (Err(err), attempt);
                }

                let delay = policy.backoff(attempt, err.kind);
                warn!(
                    op = label,
                    attempt,
                    kind = %err.kind,
                    delay_ms = delay.as_millis() as u64,
                    "Attempt failed, backing off: {}",
                    err.message
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
