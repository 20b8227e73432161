//! Backoff policy for rate-limited analysis calls.
//!
//! Kept as pure arithmetic so the schedule can be asserted in tests without
//! sleeping through it.

use std::time::Duration;

pub const MAX_RETRIES: u32 = 3;
pub const RETRY_BASE_DELAY_MS: u64 = 2000;

/// Exponential backoff: the nth retry waits `base * 2^(n-1)`, so the default
/// schedule is 2s, 4s, 8s and then the caller gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay_ms: RETRY_BASE_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
        }
    }

    /// Whether another retry may follow after `retries` completed ones.
    pub fn allows(&self, retries: u32) -> bool {
        retries < self.max_retries
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        // Exponent is clamped so a misconfigured retry count cannot
        // overflow the shift.
        let exponent = retry.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << exponent))
    }
}
