//! Shared retry/backoff policy
//!
//! Both fetch paths (page captures and embedded resources) retry the same
//! way, so the policy lives in one place: a fixed attempt cap, exponential
//! backoff from a base delay, and a fixed set of transiently-retryable
//! status codes. Anything else fails immediately.

use std::time::Duration;

/// Status codes worth retrying: rate limiting and upstream flakiness.
const RETRYABLE_STATUSES: &[u16] = &[429, 503, 504];

/// Retry policy for archive fetches.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Backoff base; attempt `n` waits `base * 2^n`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Policy with no waiting, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    /// Whether a non-200 status is transient enough to retry.
    pub fn is_retryable(&self, status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }

    /// Backoff before the attempt after `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(429));
        assert!(policy.is_retryable(503));
        assert!(policy.is_retryable(504));
        assert!(!policy.is_retryable(404));
        assert!(!policy.is_retryable(500));
        assert!(!policy.is_retryable(200));
    }

    #[test]
    fn backoff_is_nondecreasing_and_exponential() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = (0..4).map(|n| policy.backoff(n)).collect();
        assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(delays[0], Duration::from_millis(500));
        assert_eq!(delays[1], Duration::from_millis(1000));
        assert_eq!(delays[2], Duration::from_millis(2000));
    }

    #[test]
    fn immediate_policy_never_waits() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.backoff(5), Duration::ZERO);
    }
}
