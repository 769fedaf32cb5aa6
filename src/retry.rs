//! Retry policy with exponential backoff.
//!
//! The policy is a pure function, [`decide`], from `(attempt, outcome)` to a
//! [`Decision`]. The blocking and async executors in [`crate::transport`] both
//! drive it the same way and differ only in how they wait, so the two client
//! facades cannot drift apart.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::classify::{classify_failure, classify_response, is_retryable_status};
use crate::error::NeuralexError;
use crate::transport::{HttpResponse, TransportFailure};

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total number of transport attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubled after each further one.
    #[serde(with = "crate::serde_millis")]
    pub base_delay: Duration,
    /// Upper bound for any computed delay.
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
    /// Add up to 50% random jitter to computed delays.
    pub jitter: bool,
    /// Longest `Retry-After` hint worth waiting for. Longer hints end the call
    /// with [`NeuralexError::RateLimit`] straight away.
    #[serde(with = "crate::serde_millis")]
    pub max_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: true,
            max_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// A policy that makes exactly one attempt.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

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

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_max_retry_after(mut self, limit: Duration) -> Self {
        self.max_retry_after = limit;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// `base_delay * 2^(attempt-1)`, plus jitter in `[0, 50%]` when enabled,
    /// capped at `max_delay`. The jitter is applied before the cap, so the
    /// sequence of delays never decreases.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let computed = self.base_delay.saturating_mul(1_u32 << exponent);
        let computed_ms = u64::try_from(computed.as_millis()).unwrap_or(u64::MAX);

        let delay_ms = if self.jitter && computed_ms > 1 {
            computed_ms.saturating_add(fastrand::u64(0..=computed_ms / 2))
        } else {
            computed_ms
        };

        Duration::from_millis(delay_ms).min(self.max_delay)
    }
}

/// What an executor should do after one attempt.
#[derive(Debug)]
pub enum Decision {
    /// The service answered 2xx; hand the body to the response parser.
    Complete(String),
    /// Wait `delay`, then make another attempt.
    Retry { delay: Duration, cause: String },
    /// Stop and surface this error.
    Fail(NeuralexError),
}

/// Decide the next step after attempt number `attempt` (1-based) produced
/// `outcome`.
pub fn decide(
    policy: &RetryConfig,
    attempt: u32,
    outcome: Result<HttpResponse, TransportFailure>,
) -> Decision {
    let attempts_left = attempt < policy.max_attempts;

    match outcome {
        Ok(response) if (200..300).contains(&response.status) => {
            Decision::Complete(response.body)
        }
        Ok(response) => {
            if !attempts_left || !is_retryable_status(response.status) {
                return Decision::Fail(classify_response(&response, attempt));
            }

            let cause = format!("HTTP {}", response.status);
            match response.retry_after {
                Some(hint) if response.status == 429 && hint > policy.max_retry_after => {
                    Decision::Fail(classify_response(&response, attempt))
                }
                Some(hint) if response.status == 429 => Decision::Retry { delay: hint, cause },
                _ => Decision::Retry {
                    delay: policy.backoff(attempt),
                    cause,
                },
            }
        }
        Err(failure) => {
            if attempts_left {
                Decision::Retry {
                    delay: policy.backoff(attempt),
                    cause: failure.kind.to_string(),
                }
            } else {
                Decision::Fail(classify_failure(&failure, attempt))
            }
        }
    }
}
