//! Retry budget and recreate policy for container creation.

use std::time::Duration;

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// A container is recreated at most this many times per invocation.
pub const MAX_RECREATES: u32 = 1;

const NOT_FOUND: u16 = 404;

/// Fixed bound on the readiness polling loop.
///
/// There is no backoff: attempts are separated by the same delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    max_attempts: u32,
    delay: Duration,
}

impl RetryBudget {
    /// Creates a budget. A budget always allows at least one attempt.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Number of health checks, always at least one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause between two consecutive health checks.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

/// Policy applied by the lifecycle controller when creating a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Budget of the readiness polling loop
    pub budget: RetryBudget,
    /// Recreate the container once when the last health check returned 404
    pub retry_on_not_found: bool,
}

impl LifecyclePolicy {
    pub fn new(budget: RetryBudget, retry_on_not_found: bool) -> Self {
        Self {
            budget,
            retry_on_not_found,
        }
    }

    /// Decides whether an exhausted, rolled back creation gets another go.
    ///
    /// Revizor occasionally loses track of a container it has just created;
    /// the health endpoint then answers 404. Only that cause, and only on the
    /// first creation attempt, leads to a recreate.
    ///
    /// # Arguments
    ///
    /// * `creation_attempt` - 1-based number of the creation that just failed
    /// * `last_status` - status of the final health check, `None` on transport errors
    pub fn should_recreate(&self, creation_attempt: u32, last_status: Option<u16>) -> bool {
        self.retry_on_not_found
            && creation_attempt <= MAX_RECREATES
            && last_status == Some(NOT_FOUND)
    }
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self::new(RetryBudget::default(), true)
    }
}
