use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry budget with linear backoff.
///
/// The wait before retry `n` (1-indexed) is `n × base_delay_ms`, so the
/// default lookup policy sleeps 2s, 4s, 6s, ... between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries (not including the initial attempt)
    pub max_retries: u32,

    /// Backoff unit in milliseconds
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
        }
    }

    /// Returns a policy with no retries.
    pub fn no_retry() -> Self {
        Self::new(0, 0)
    }

    /// Policy for resolving deferred lookup results: 5 retries, 2s unit.
    pub fn lookup() -> Self {
        Self::new(5, 2000)
    }

    /// Policy for transient transport failures: 2 retries (3 attempts), 2s unit.
    pub fn transport() -> Self {
        Self::new(2, 2000)
    }

    /// Backoff before retry number `attempt` (1-indexed).
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(u64::from(attempt)))
    }

    /// True if retry number `attempt` (1-indexed) is within budget.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }
}

impl Default for RetryPolicy {
    /// Same as [`RetryPolicy::lookup`].
    fn default() -> Self {
        Self::lookup()
    }
}
