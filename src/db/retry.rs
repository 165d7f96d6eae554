//! Reconnect backoff for unreachable databases.

use std::time::Duration;

pub const DEFAULT_RETRY_INITIAL_SECS: u64 = 30;
pub const DEFAULT_RETRY_RESET_SECS: u64 = 300;

/// How long to wait between attempts while a database is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// First delay, and the value the delay falls back to after a reset.
    pub initial: Duration,
    /// A pending delay above this is reset to `initial` before it is used.
    pub reset_above: Duration,
}

impl RetryPolicy {
    pub fn new(initial: Duration, reset_above: Duration) -> Self {
        Self {
            initial,
            reset_above,
        }
    }

    pub fn from_secs(initial: u64, reset_above: u64) -> Self {
        Self::new(Duration::from_secs(initial), Duration::from_secs(reset_above))
    }

    /// Fresh backoff state for one execution.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            policy: *self,
            current: self.initial,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_secs(DEFAULT_RETRY_INITIAL_SECS, DEFAULT_RETRY_RESET_SECS)
    }
}

/// Backoff state for a single retried execution.
///
/// The delay doubles after every sleep; once it exceeds `reset_above` it
/// drops back to `initial` before the next sleep. With the defaults this
/// yields 30, 60, 120, 240, 30, 60, ... seconds.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    current: Duration,
}

impl Backoff {
    /// Delay to sleep before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        if self.current > self.policy.reset_above {
            self.current = self.policy.initial;
        }
        let delay = self.current;
        self.current = self.current.saturating_mul(2);
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(delays: &[Duration]) -> Vec<u64> {
        delays.iter().map(Duration::as_secs).collect()
    }

    #[test]
    fn test_default_sequence_resets_after_exceeding_cap() {
        let mut backoff = RetryPolicy::default().backoff();
        let delays: Vec<Duration> = (0..10).map(|_| backoff.next_delay()).collect();
        assert_eq!(
            secs(&delays),
            vec![30, 60, 120, 240, 30, 60, 120, 240, 30, 60]
        );
    }

    #[test]
    fn test_value_equal_to_cap_is_not_reset() {
        let mut backoff = RetryPolicy::from_secs(75, 300).backoff();
        let delays: Vec<Duration> = (0..5).map(|_| backoff.next_delay()).collect();
        assert_eq!(secs(&delays), vec![75, 150, 300, 75, 150]);
    }

    #[test]
    fn test_initial_above_cap_still_sleeps_initial() {
        let mut backoff = RetryPolicy::from_secs(500, 300).backoff();
        assert_eq!(backoff.next_delay().as_secs(), 500);
        assert_eq!(backoff.next_delay().as_secs(), 500);
    }

    #[test]
    fn test_each_execution_starts_fresh() {
        let policy = RetryPolicy::default();
        let mut first = policy.backoff();
        first.next_delay();
        first.next_delay();
        assert_eq!(policy.backoff().next_delay().as_secs(), 30);
    }
}
