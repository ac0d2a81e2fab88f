//! Bounded exponential backoff for failed reconciliations.
use std::time::Duration;

/// Parameters for the per-event retry loop.
///
/// The default policy makes a single attempt with no delay; hosts opt in to
/// retries explicitly. Delays grow geometrically:
///
/// ```
/// use operon_runtime::RetryPolicy;
/// use std::time::Duration;
/// let policy = RetryPolicy::default()
///     .attempts(4)
///     .initial_delay(Duration::from_millis(100))
///     .multiplier(2.0);
/// assert_eq!(policy.delay_for(3), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts for one event, including the first (≥ 1)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Factor applied to the delay after every failed attempt (≥ 1)
    pub delay_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            delay_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Set the total number of attempts; values below 1 are clamped to 1.
    #[must_use]
    pub fn attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the delay preceding the second attempt.
    #[must_use]
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the backoff factor; values below 1 are clamped to 1.
    #[must_use]
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.delay_multiplier = multiplier.max(1.0);
        self
    }

    /// The sleep between attempt number `attempt` (1-based) and the next one.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        self.initial_delay.mul_f64(self.delay_multiplier.powi(exponent))
    }
}
