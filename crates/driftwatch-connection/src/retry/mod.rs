//! Retry wrapper around an arbitrary async closure.
//!
//! This retries a boxed async factory: callers hand us a `Fn() -> Future`
//! rather than a fixed `Service`, since `ConnectionManager::execute_with_retry`
//! is keyed by a logical target string, not one statically-typed service.

mod backoff;

pub use backoff::ExponentialBackoff;

use std::future::Future;
use std::time::Instant;

use driftwatch_core::EventListeners;
use tokio::time::sleep;

use crate::error::ConnectionError;
use crate::events::ConnectionEvent;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub backoff: ExponentialBackoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: ExponentialBackoff::default(),
        }
    }
}

/// Runs `make_call` up to `config.max_attempts` times (the first call plus
/// `max_attempts - 1` retries), sleeping per `config.backoff` between
/// attempts. Only errors where [`ConnectionError::is_retryable`] is `true`
/// are retried; everything else returns immediately.
///
/// `make_call` takes the attempt's rewound request body, if any, via the
/// `rewind` factory. When `rewind` is `None` the call is attempted exactly
/// once regardless of `config.max_attempts`, per the "bodies that cannot be
/// rewound refuse retry" rule.
pub async fn retry_with_backoff<F, Fut, T>(
    target: &str,
    config: &RetryConfig,
    event_listeners: &EventListeners<ConnectionEvent>,
    rewindable: bool,
    mut make_call: F,
) -> Result<T, ConnectionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ConnectionError>>,
{
    let attempt_cap = if rewindable { config.max_attempts.max(1) } else { 1 };
    let mut last_err = None;

    for attempt in 0..attempt_cap {
        match make_call().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() || attempt + 1 == attempt_cap {
                    last_err = Some(err);
                    break;
                }
                let delay = config.backoff.delay_for(attempt);
                event_listeners.emit(&ConnectionEvent::RetryAttempted {
                    target: target.to_string(),
                    timestamp: Instant::now(),
                    attempt: attempt + 1,
                    delay_ms: delay.as_millis() as u64,
                });
                sleep(delay).await;
                last_err = Some(err);
            }
        }
    }

    if attempt_cap > 1 {
        event_listeners.emit(&ConnectionEvent::RetryExhausted {
            target: target.to_string(),
            timestamp: Instant::now(),
            attempts: attempt_cap,
        });
    }

    Err(last_err.expect("loop always assigns an error before exiting without returning Ok"))
}
