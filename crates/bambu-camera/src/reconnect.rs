//! Reconnect decisions for the camera session.

use std::time::Duration;

/// Outcome of [`ReconnectPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectDecision {
    /// Whether another connection attempt is allowed.
    pub retry: bool,
    /// Wait before the next attempt.
    pub delay: Duration,
}

/// Bounded, fixed-delay reconnect policy.
///
/// Decisions depend only on the attempt counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts allowed after the first one.
    pub max_retries: u32,
    /// Delay between attempts.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_secs(3),
        }
    }
}

impl ReconnectPolicy {
    /// Decide whether to reconnect after `attempt_count` attempts have been made.
    pub fn decide(&self, attempt_count: u32) -> ReconnectDecision {
        ReconnectDecision {
            retry: attempt_count <= self.max_retries,
            delay: self.delay,
        }
    }

    /// Total connection attempts this policy permits.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}
