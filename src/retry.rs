/// What to do with a request whose response was not ok
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Server asked us to slow down; re-queue without spending an attempt
    Throttled,
    /// Re-queue and count the failure
    Retry { next_attempt: u32 },
    /// Budget spent; fail the request
    Exhausted,
}

/// Retry budget for non-ok responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub throttle_status: u16,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            throttle_status: 429,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, throttle_status: u16) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            throttle_status,
        }
    }

    pub fn is_throttle(&self, status: u16) -> bool {
        status == self.throttle_status
    }

    /// Decide the fate of counted attempt `attempt` (1-based) that ended with `status`.
    ///
    /// A request gets exactly `max_attempts` counted exchanges: the failure on attempt
    /// `max_attempts` is terminal. This intentionally differs from re-queueing while
    /// `attempt <= max_attempts`, which would allow one extra exchange.
    pub fn decide(&self, attempt: u32, status: u16) -> RetryDecision {
        if self.is_throttle(status) {
            RetryDecision::Throttled
        } else if attempt < self.max_attempts {
            RetryDecision::Retry {
                next_attempt: attempt + 1,
            }
        } else {
            RetryDecision::Exhausted
        }
    }
}
