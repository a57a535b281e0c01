//! Bounded retry policy for lost or failed connections.

use std::time::Duration;

use crate::models::ConnectionOptions;

/// How the delay before a retry grows with the attempt count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Same delay before every attempt.
    Fixed,
    /// `base * 2^attempts`, capped at `max_delay`.
    Exponential { max_delay: Duration },
}

/// Decides whether another attempt is allowed and how long to wait for it.
///
/// `attempts` counts retries scheduled since the last successful open. The
/// policy permits a retry while `attempts < max_attempts`; with the default
/// of 5 a connection that never succeeds is opened 6 times in total.
///
/// ```rust
/// use party_link::ReconnectPolicy;
/// use std::time::Duration;
///
/// let policy = ReconnectPolicy::fixed(Duration::from_millis(1000), 5);
/// assert_eq!(policy.next_delay(0), Some(Duration::from_millis(1000)));
/// assert_eq!(policy.next_delay(4), Some(Duration::from_millis(1000)));
/// assert_eq!(policy.next_delay(5), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    enabled: bool,
    base_delay: Duration,
    max_attempts: u32,
    strategy: BackoffStrategy,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_millis(1000), 5)
    }
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            enabled: true,
            base_delay: delay,
            max_attempts,
            strategy: BackoffStrategy::Fixed,
        }
    }

    pub fn exponential(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            enabled: true,
            base_delay,
            max_attempts,
            strategy: BackoffStrategy::Exponential { max_delay },
        }
    }

    /// Never retry: the first failure is terminal.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            base_delay: Duration::ZERO,
            max_attempts: 0,
            strategy: BackoffStrategy::Fixed,
        }
    }

    pub fn from_options(options: &ConnectionOptions) -> Self {
        if !options.auto_reconnect {
            return Self::disabled();
        }
        let base = Duration::from_millis(options.reconnect_delay_ms);
        if options.exponential_backoff {
            Self::exponential(
                base,
                Duration::from_millis(options.max_reconnect_delay_ms),
                options.max_reconnect_attempts,
            )
        } else {
            Self::fixed(base, options.max_reconnect_attempts)
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn strategy(&self) -> BackoffStrategy {
        self.strategy
    }

    /// `false` when auto-reconnect is off or the budget is zero.
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.max_attempts > 0
    }

    /// Delay before the next attempt, or `None` once the budget is spent.
    pub fn next_delay(&self, attempts: u32) -> Option<Duration> {
        if !self.enabled || attempts >= self.max_attempts {
            return None;
        }
        Some(match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Exponential { max_delay } => {
                let factor = 2u32.saturating_pow(attempts);
                std::cmp::min(self.base_delay.saturating_mul(factor), max_delay)
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_fixed_five_attempts() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.strategy(), BackoffStrategy::Fixed);
        for attempts in 0..5 {
            assert_eq!(policy.next_delay(attempts), Some(Duration::from_secs(1)));
        }
        assert_eq!(policy.next_delay(5), None);
        assert_eq!(policy.next_delay(u32::MAX), None);
    }

    #[test]
    fn test_exponential_policy_is_capped() {
        let policy = ReconnectPolicy::exponential(
            Duration::from_millis(500),
            Duration::from_secs(3),
            10,
        );
        assert_eq!(policy.next_delay(0), Some(Duration::from_millis(500)));
        assert_eq!(policy.next_delay(1), Some(Duration::from_millis(1000)));
        assert_eq!(policy.next_delay(2), Some(Duration::from_millis(2000)));
        assert_eq!(policy.next_delay(3), Some(Duration::from_secs(3)));
        assert_eq!(policy.next_delay(9), Some(Duration::from_secs(3)));
        assert_eq!(policy.next_delay(10), None);
    }

    #[test]
    fn test_disabled_and_zero_budget() {
        assert!(!ReconnectPolicy::disabled().is_enabled());
        assert_eq!(ReconnectPolicy::disabled().next_delay(0), None);

        let zero = ReconnectPolicy::fixed(Duration::from_millis(100), 0);
        assert!(!zero.is_enabled());
        assert_eq!(zero.next_delay(0), None);
    }

    #[test]
    fn test_from_options() {
        let options = ConnectionOptions::default()
            .with_reconnect_delay_ms(3000)
            .with_max_reconnect_attempts(2);
        let policy = ReconnectPolicy::from_options(&options);
        assert_eq!(policy.next_delay(1), Some(Duration::from_millis(3000)));
        assert_eq!(policy.next_delay(2), None);

        let off = ReconnectPolicy::from_options(&options.clone().with_auto_reconnect(false));
        assert!(!off.is_enabled());

        let exp = ReconnectPolicy::from_options(&options.with_exponential_backoff(true));
        assert!(matches!(exp.strategy(), BackoffStrategy::Exponential { .. }));
    }
}
