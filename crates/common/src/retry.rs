//! Retry policy with exponential backoff.

use std::time::Duration;

/// Exponential backoff used for background delivery.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts (including the first) before giving up.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(3600),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after `failed_attempts` failures (1-indexed).
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(32) as i32;
        let delay_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        if delay_secs.is_nan() || delay_secs <= 0.0 {
            return Duration::ZERO;
        }
        if delay_secs.is_infinite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }

        Duration::from_secs_f64(delay_secs)
    }

    /// Whether another attempt is allowed after `failed_attempts` failures.
    #[must_use]
    pub const fn should_retry(&self, failed_attempts: u32) -> bool {
        failed_attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_after(1), Duration::from_secs(30));
        assert_eq!(policy.delay_after(2), Duration::from_secs(60));
        assert_eq!(policy.delay_after(3), Duration::from_secs(120));
        assert_eq!(policy.delay_after(4), Duration::from_secs(240));
    }

    #[test]
    fn test_max_delay() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_secs(3600),
            max_delay: Duration::from_secs(7200),
            multiplier: 2.0,
        };

        assert_eq!(policy.delay_after(6), Duration::from_secs(7200));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(7200));
    }

    #[test]
    fn test_negative_multiplier_never_panics() {
        let policy = RetryPolicy {
            multiplier: -2.0,
            ..Default::default()
        };

        assert_eq!(policy.delay_after(1), Duration::from_secs(30));
        assert_eq!(policy.delay_after(2), Duration::ZERO);
        assert_eq!(policy.delay_after(3), Duration::from_secs(120));

        let nan = RetryPolicy {
            multiplier: f64::NAN,
            ..Default::default()
        };
        assert_eq!(nan.delay_after(2), Duration::ZERO);
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..Default::default()
        };

        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!policy.should_retry(4));
    }
}
