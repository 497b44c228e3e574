use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Immutable backoff configuration for one client instance.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_factor: config.backoff_factor,
            jitter: config.jitter,
        }
    }

    /// Delay before retry number `attempt` (1-based):
    /// `min(initial * factor^(attempt-1), max)`, jittered by +/-25% when
    /// enabled.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let base_ms = self.initial_delay.as_millis() as f64
            * self.backoff_factor.powi(exponent as i32);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);
        let final_ms = if self.jitter {
            capped_ms * rand::thread_rng().gen_range(0.75..=1.25)
        } else {
            capped_ms
        };
        Duration::from_millis(final_ms.round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(jitter: bool) -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(1000),
            backoff_factor: 2.0,
            jitter,
        }
    }

    #[test]
    fn deterministic_delay_sequence() {
        let policy = policy(false);
        let delays: Vec<u64> = (1..=3).map(|a| policy.delay_for(a).as_millis() as u64).collect();
        assert_eq!(delays, vec![10, 20, 40]);
    }

    #[test]
    fn delay_is_capped_at_max() {
        let policy = policy(false);
        assert_eq!(policy.delay_for(20), Duration::from_millis(1000));
    }

    #[test]
    fn jitter_stays_within_quarter_band() {
        let policy = policy(true);
        for _ in 0..100 {
            let delay = policy.delay_for(3).as_millis() as f64;
            assert!((30.0..=50.0).contains(&delay), "delay {} outside band", delay);
        }
    }
}
