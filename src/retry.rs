//! Backoff computation for transient fetch failures.
//!
//! Workers retry the HTTP fetch step on transient errors (see
//! [`IsRetryable`](crate::error::IsRetryable)) with exponential backoff and
//! optional jitter. Negotiation errors are final and never pass through here.

use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;

/// Delay to sleep before retry number `attempt` (1-based: `attempt = 1` is
/// the delay after the first failure).
///
/// Exponential backoff from `initial_delay` by `backoff_multiplier`, capped at
/// `max_delay`, with up to 50% random jitter added when enabled.
pub fn delay_for_attempt(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let base = config.initial_delay.as_millis() as f64
        * config.backoff_multiplier.powi(exponent as i32);
    let capped = base.min(config.max_delay.as_millis() as f64);

    let millis = if config.jitter {
        let jitter = rand::thread_rng().gen_range(0.0..=0.5);
        capped * (1.0 + jitter)
    } else {
        capped
    };

    Duration::from_millis(millis as u64).min(config.max_delay.mul_f64(1.5))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn config_without_jitter() -> RetryConfig {
        RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let config = config_without_jitter();
        assert_eq!(delay_for_attempt(&config, 1), Duration::from_millis(100));
        assert_eq!(delay_for_attempt(&config, 2), Duration::from_millis(200));
        assert_eq!(delay_for_attempt(&config, 3), Duration::from_millis(400));
    }

    #[test]
    fn backoff_is_capped_at_max_delay() {
        let config = config_without_jitter();
        assert_eq!(delay_for_attempt(&config, 10), Duration::from_millis(1000));
    }

    #[test]
    fn jitter_stays_within_half_of_base() {
        let config = RetryConfig {
            jitter: true,
            ..config_without_jitter()
        };
        for _ in 0..50 {
            let delay = delay_for_attempt(&config, 1);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }
}
