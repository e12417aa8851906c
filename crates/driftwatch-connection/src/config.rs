//! Builder-style configuration for [`crate::manager::ConnectionManager`].

use std::time::Duration;

use crate::circuit::CircuitConfig;
use crate::pool::PoolConfig;
use crate::ratelimiter::RateLimiterConfig;
use crate::retry::{ExponentialBackoff, RetryConfig};

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub pool: PoolConfig,
    pub circuit_failure_threshold: u32,
    pub circuit_recovery_window: Duration,
    pub retry_max_attempts: usize,
    pub retry_initial_backoff: Duration,
    pub retry_max_backoff: Duration,
    pub rate_limit_capacity: u32,
    pub rate_limit_refill_interval: Duration,
    pub rate_limit_wait_timeout: Duration,
    pub call_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            circuit_failure_threshold: 5,
            circuit_recovery_window: Duration::from_secs(30),
            retry_max_attempts: 3,
            retry_initial_backoff: Duration::from_secs(1),
            retry_max_backoff: Duration::from_secs(30),
            rate_limit_capacity: 10,
            rate_limit_refill_interval: Duration::from_secs(1),
            rate_limit_wait_timeout: Duration::from_secs(5),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl ConnectionConfig {
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    pub(crate) fn circuit_config(&self, target: &str) -> CircuitConfig {
        CircuitConfig {
            failure_threshold: self.circuit_failure_threshold,
            recovery_window: self.circuit_recovery_window,
            name: target.to_string(),
        }
    }

    pub(crate) fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry_max_attempts,
            backoff: ExponentialBackoff {
                initial: self.retry_initial_backoff,
                max: self.retry_max_backoff,
                multiplier: 2.0,
            },
        }
    }

    pub(crate) fn rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            capacity: self.rate_limit_capacity,
            refill_interval: self.rate_limit_refill_interval,
            wait_timeout: self.rate_limit_wait_timeout,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    pub fn circuit_failure_threshold(mut self, n: u32) -> Self {
        self.config.circuit_failure_threshold = n;
        self
    }

    pub fn circuit_recovery_window(mut self, d: Duration) -> Self {
        self.config.circuit_recovery_window = d;
        self
    }

    pub fn retry_max_attempts(mut self, n: usize) -> Self {
        self.config.retry_max_attempts = n;
        self
    }

    pub fn retry_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.retry_initial_backoff = initial;
        self.config.retry_max_backoff = max;
        self
    }

    pub fn rate_limit(mut self, capacity: u32, refill_interval: Duration) -> Self {
        self.config.rate_limit_capacity = capacity;
        self.config.rate_limit_refill_interval = refill_interval;
        self
    }

    pub fn call_timeout(mut self, d: Duration) -> Self {
        self.config.call_timeout = d;
        self
    }

    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}
