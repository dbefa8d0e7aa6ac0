use std::time::{Duration, Instant};

/// Status reported for failures that never produced an HTTP response
pub const TRANSPORT_FAILURE: u16 = 0;

/// Longest wait before a retry
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);

/// Bounded retry with a fixed delay
///
/// The delay is constant rather than exponential; it is the `retry-delay-ms`
/// configuration point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Wait before each retry
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy, capping the delay at [`MAX_RETRY_DELAY`]
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay: delay.min(MAX_RETRY_DELAY),
        }
    }

    /// Transport failures, server errors and 429 are worth retrying
    pub fn is_retryable_status(status: u16) -> bool {
        status == TRANSPORT_FAILURE || status >= 500 || status == 429
    }

    /// Decides whether the attempt that just failed with `status` is retried
    pub fn should_retry(&self, state: &RetryState, status: u16) -> bool {
        Self::is_retryable_status(status) && state.retries_made() < self.max_retries
    }
}

/// Attempt bookkeeping for a single target
#[derive(Debug, Clone)]
pub struct RetryState {
    /// Attempts dispatched so far, including the first
    pub attempts: u32,
    pub domain: String,
    /// Earliest time the next attempt may be dispatched
    pub next_eligible: Option<Instant>,
}

impl RetryState {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            attempts: 0,
            domain: domain.into(),
            next_eligible: None,
        }
    }

    /// Records that an attempt is being dispatched
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
        self.next_eligible = None;
    }

    pub fn retries_made(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    /// Schedules the next attempt one retry delay from `now`
    pub fn schedule_retry(&mut self, policy: &RetryPolicy, now: Instant) -> Duration {
        let delay = policy.delay.min(MAX_RETRY_DELAY);
        self.next_eligible = Some(now.checked_add(delay).unwrap_or(now));
        delay
    }
}
