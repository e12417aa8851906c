//! Per-target token bucket rate limiter.
//!
//! Each target gets its own bucket: capacity tokens, refilled continuously
//! at `capacity / refill_interval` tokens per second. `acquire()` takes one
//! token immediately if available, otherwise sleeps until the next token is
//! minted or the configured wait timeout elapses.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub capacity: u32,
    pub refill_interval: Duration,
    pub wait_timeout: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            refill_interval: Duration::from_secs(1),
            wait_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
struct TokenBucketState {
    capacity: f64,
    tokens: f64,
    refill_rate_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucketState {
    fn new(config: &RateLimiterConfig) -> Self {
        let refill_rate_per_sec = config.capacity as f64 / config.refill_interval.as_secs_f64();
        Self {
            capacity: config.capacity as f64,
            tokens: config.capacity as f64,
            refill_rate_per_sec,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        if elapsed <= 0.0 {
            return;
        }
        self.tokens = (self.tokens + elapsed * self.refill_rate_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Returns `Ok(Duration::ZERO)` if a token was taken immediately,
    /// `Ok(wait)` if the caller should sleep `wait` before a token is
    /// available, or `Err(())` if that wait would exceed the timeout.
    fn try_acquire(&mut self, timeout: Duration) -> Result<Duration, ()> {
        let now = Instant::now();
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Ok(Duration::ZERO);
        }

        let deficit = 1.0 - self.tokens;
        let wait = Duration::from_secs_f64(deficit / self.refill_rate_per_sec);
        if wait > timeout {
            Err(())
        } else {
            Ok(wait)
        }
    }

    fn available_tokens(&mut self) -> f64 {
        self.refill(Instant::now());
        self.tokens
    }
}

/// Shared across every caller targeting the same logical target string.
#[derive(Debug, Clone)]
pub struct TargetRateLimiter {
    state: Arc<Mutex<TokenBucketState>>,
    wait_timeout: Duration,
}

impl TargetRateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        let wait_timeout = config.wait_timeout;
        Self {
            state: Arc::new(Mutex::new(TokenBucketState::new(&config))),
            wait_timeout,
        }
    }

    /// Blocks until a token is available or the wait timeout elapses.
    pub async fn acquire(&self) -> Result<(), ()> {
        let first = {
            let mut state = self.state.lock().unwrap();
            state.try_acquire(self.wait_timeout)
        };

        match first {
            Ok(Duration::ZERO) => Ok(()),
            Ok(wait) => {
                sleep(wait).await;
                let mut state = self.state.lock().unwrap();
                // The sleep should have minted the token already; allow a
                // small grace window for scheduler slop instead of a hard
                // zero timeout.
                state.try_acquire(Duration::from_millis(5)).map(|_| ())
            }
            Err(()) => Err(()),
        }
    }

    pub fn available_tokens(&self) -> f64 {
        self.state.lock().unwrap().available_tokens()
    }
}
