//! Composes the client pool, circuit breaker, rate limiter, and retry
//! wrapper into the single entry point collectors and export plugins call.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use driftwatch_core::{EventListener, EventListeners};
use tokio::time::timeout;

use crate::circuit::Circuit;
use crate::config::ConnectionConfig;
use crate::error::ConnectionError;
use crate::events::ConnectionEvent;
use crate::pool::ClientPool;
use crate::ratelimiter::TargetRateLimiter;
use crate::retry::retry_with_backoff;

/// Shared per-target state plus the pool and config; clone is cheap (an
/// `Arc` bump), so every collector/plugin can hold its own `ConnectionManager`.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: ConnectionConfig,
    pool: ClientPool,
    circuits: RwLock<HashMap<String, Arc<Circuit>>>,
    rate_limiters: RwLock<HashMap<String, TargetRateLimiter>>,
    // Read far more often than written (once per new target's circuit), so
    // a snapshot-on-read clone of the listener list is cheaper than making
    // every circuit share a lock on every emit.
    event_listeners: RwLock<EventListeners<ConnectionEvent>>,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool: ClientPool::new(config.pool.clone()),
                config,
                circuits: RwLock::new(HashMap::new()),
                rate_limiters: RwLock::new(HashMap::new()),
                event_listeners: RwLock::new(EventListeners::new()),
            }),
        }
    }

    /// Only affects circuits created after this call; existing circuits
    /// keep the listener snapshot they were built with.
    pub fn subscribe(&self, listener: impl EventListener<ConnectionEvent> + 'static) {
        self.inner.event_listeners.write().unwrap().add(listener);
    }

    pub fn client_pool(&self) -> &ClientPool {
        &self.inner.pool
    }

    pub fn circuit(&self, target: &str) -> Arc<Circuit> {
        if let Some(circuit) = self.inner.circuits.read().unwrap().get(target) {
            return circuit.clone();
        }
        let mut circuits = self.inner.circuits.write().unwrap();
        if let Some(circuit) = circuits.get(target) {
            return circuit.clone();
        }
        let listeners = self.inner.event_listeners.read().unwrap().clone();
        let circuit = Arc::new(Circuit::new(
            self.inner.config.circuit_config(target),
            listeners,
        ));
        circuits.insert(target.to_string(), circuit.clone());
        circuit
    }

    fn rate_limiter(&self, target: &str) -> TargetRateLimiter {
        if let Some(limiter) = self.inner.rate_limiters.read().unwrap().get(target) {
            return limiter.clone();
        }
        let mut limiters = self.inner.rate_limiters.write().unwrap();
        if let Some(limiter) = limiters.get(target) {
            return limiter.clone();
        }
        let limiter = TargetRateLimiter::new(self.inner.config.rate_limiter_config());
        limiters.insert(target.to_string(), limiter.clone());
        limiter
    }

    /// Runs `call` under `target`'s breaker, rate limiter, per-call timeout,
    /// and retry policy. `rewindable` must be `true` for any request whose
    /// body the retry wrapper is allowed to resend.
    pub async fn execute_with_retry<F, Fut, T>(
        &self,
        target: &str,
        rewindable: bool,
        call: F,
    ) -> Result<T, ConnectionError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ConnectionError>>,
    {
        let circuit = self.circuit(target);
        let rate_limiter = self.rate_limiter(target);
        let call_timeout = self.inner.config.call_timeout;
        let retry_config = self.inner.config.retry_config();
        let event_listeners = self.inner.event_listeners.read().unwrap().clone();

        retry_with_backoff(target, &retry_config, &event_listeners, rewindable, || {
            let circuit = circuit.clone();
            let rate_limiter = rate_limiter.clone();
            let call = &call;
            async move {
                if !circuit.try_acquire() {
                    return Err(ConnectionError::CircuitOpen {
                        target: target.to_string(),
                    });
                }

                if rate_limiter.acquire().await.is_err() {
                    return Err(ConnectionError::RateLimited {
                        target: target.to_string(),
                    });
                }

                let started = std::time::Instant::now();
                let outcome = timeout(call_timeout, call()).await;

                match outcome {
                    Ok(Ok(value)) => {
                        circuit.record_success();
                        Ok(value)
                    }
                    Ok(Err(err)) => {
                        circuit.record_failure();
                        Err(err)
                    }
                    Err(_elapsed) => {
                        circuit.record_failure();
                        Err(ConnectionError::Timeout {
                            target: target.to_string(),
                            elapsed_ms: started.elapsed().as_millis() as u64,
                        })
                    }
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn circuit_opens_after_threshold_and_rejects_fast() {
        let manager = ConnectionManager::new(ConnectionConfig {
            circuit_failure_threshold: 2,
            retry_max_attempts: 1,
            rate_limit_capacity: 100,
            ..ConnectionConfig::default()
        });

        for _ in 0..2 {
            let result: Result<(), ConnectionError> = manager
                .execute_with_retry("acme", true, || async {
                    Err(ConnectionError::Network {
                        target: "acme".into(),
                        message: "boom".into(),
                    })
                })
                .await;
            assert!(result.is_err());
        }

        let calls = AtomicUsize::new(0);
        let result: Result<(), ConnectionError> = manager
            .execute_with_retry("acme", true, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert!(matches!(result, Err(ConnectionError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_call_returns_value() {
        let manager = ConnectionManager::new(ConnectionConfig {
            rate_limit_capacity: 100,
            ..ConnectionConfig::default()
        });

        let result = manager
            .execute_with_retry("acme", true, || async { Ok::<_, ConnectionError>(7) })
            .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn call_exceeding_timeout_is_reported_as_timeout() {
        let manager = ConnectionManager::new(ConnectionConfig {
            call_timeout: Duration::from_millis(10),
            retry_max_attempts: 1,
            rate_limit_capacity: 100,
            ..ConnectionConfig::default()
        });

        let result: Result<(), ConnectionError> = manager
            .execute_with_retry("acme", true, || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(ConnectionError::Timeout { .. })));
    }
}
