// A generic retry/backoff policy shared by every binary in the workspace,
// in the style of `tos_common::api::callback::CALLBACK_RETRY_DELAYS_MS`.

use std::time::Duration;

/// A fixed-count retry policy with per-attempt backoff delays.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Uniform policy: `attempts` tries, `delay` between each.
    pub fn fixed(attempts: usize, delay: Duration) -> Self {
        Self {
            delays: std::iter::repeat(delay).take(attempts).collect(),
        }
    }

    pub fn attempts(&self) -> usize {
        self.delays.len()
    }

    pub fn delay_for(&self, attempt: usize) -> Option<Duration> {
        self.delays.get(attempt).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_policy_has_uniform_delays() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(5));
        assert_eq!(policy.attempts(), 3);
        assert_eq!(policy.delay_for(0), Some(Duration::from_secs(5)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_secs(5)));
        assert_eq!(policy.delay_for(3), None);
    }
}
