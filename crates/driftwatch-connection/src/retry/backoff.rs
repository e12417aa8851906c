//! Exponential backoff schedule used by the retry wrapper.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl ExponentialBackoff {
    /// `attempt` is 0-indexed: the delay before the first retry (attempt 0)
    /// is `initial`, doubling (by `multiplier`) each attempt after, capped
    /// at `max`.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        let millis = self.initial.as_secs_f64() * 1000.0 * factor;
        let capped = millis.min(self.max.as_secs_f64() * 1000.0);
        Duration::from_millis(capped.max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_each_attempt_until_capped() {
        let backoff = ExponentialBackoff::default();
        assert_eq!(backoff.delay_for(0), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(1), Duration::from_secs(2));
        assert_eq!(backoff.delay_for(2), Duration::from_secs(4));
        assert_eq!(backoff.delay_for(10), Duration::from_secs(30));
    }
}
