//! Exponential backoff for oracle calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry policy applied to retriable oracle failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds.
    pub initial_backoff_ms: u64,
    /// Backoff multiplier (e.g., 2.0 for exponential).
    pub backoff_multiplier: f64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    /// No retries at all; the first failure is final.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff delay before retry `attempt` (1-indexed; attempt 0 is the first try).
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        if attempt == 0 {
            return 0;
        }
        let delay =
            self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32 - 1);
        (delay as u64).min(self.max_backoff_ms)
    }

    /// Whether another retry is allowed after `attempt` retries.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms(attempt))
    }

    /// Delay before retry `attempt`, stretched to a server-provided
    /// `Retry-After` hint but never past the cap.
    pub fn delay_with_hint(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let base = self.backoff_duration(attempt);
        match retry_after {
            Some(hint) => base
                .max(hint)
                .min(Duration::from_millis(self.max_backoff_ms)),
            None => base,
        }
    }
}

impl Default for RetryPolicy {
    /// Default: 6 retries, 1s initial backoff, 2x multiplier, 30s max.
    fn default() -> Self {
        Self {
            max_retries: 6,
            initial_backoff_ms: 1_000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_ms(0), 0);
        assert_eq!(policy.backoff_ms(1), 1_000);
        assert_eq!(policy.backoff_ms(2), 2_000);
        assert_eq!(policy.backoff_ms(5), 16_000);
        assert_eq!(policy.backoff_ms(6), 30_000);
        assert_eq!(policy.backoff_ms(20), 30_000);
    }

    #[test]
    fn test_should_retry_respects_limit() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(5));
        assert!(!policy.should_retry(6));
        assert!(!RetryPolicy::none().should_retry(0));
    }

    #[test]
    fn test_retry_after_hint_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_with_hint(1, Some(Duration::from_secs(5))),
            Duration::from_secs(5)
        );
        assert_eq!(
            policy.delay_with_hint(3, Some(Duration::from_millis(10))),
            Duration::from_secs(4)
        );
        assert_eq!(
            policy.delay_with_hint(1, Some(Duration::from_secs(600))),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let policy: RetryPolicy = toml::from_str("max_retries = 2").unwrap();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.initial_backoff_ms, 1_000);
    }
}
