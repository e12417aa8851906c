//! Per-target circuit breaker.
//!
//! After N consecutive failures (default 5) a target's circuit opens and
//! calls fail fast with [`crate::ConnectionError::CircuitOpen`]. After a
//! recovery window (default 30s) a single probe call is let through; success
//! closes the breaker, failure re-opens it.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use driftwatch_core::{EventListeners, HealthTriggerable, TriggerHealth};
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::events::ConnectionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitConfig {
    pub failure_threshold: u32,
    pub recovery_window: Duration,
    pub name: String,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_window: Duration::from_secs(30),
            name: "<unnamed>".to_string(),
        }
    }
}

/// A single target's breaker state machine. Shared across clones of a
/// [`crate::manager::ConnectionManager`] through an `Arc`.
pub struct Circuit {
    config: CircuitConfig,
    state: AtomicU8,
    state_since: std::sync::Mutex<Instant>,
    consecutive_failures: std::sync::atomic::AtomicU32,
    event_listeners: EventListeners<ConnectionEvent>,
}

impl Circuit {
    pub fn new(config: CircuitConfig, event_listeners: EventListeners<ConnectionEvent>) -> Self {
        Self {
            config,
            state: AtomicU8::new(CircuitState::Closed as u8),
            state_since: std::sync::Mutex::new(Instant::now()),
            consecutive_failures: std::sync::atomic::AtomicU32::new(0),
            event_listeners,
        }
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns `true` if a call should be let through right now. If the
    /// circuit is open but the recovery window has elapsed, this
    /// transitions to half-open and permits exactly that one probe.
    pub fn try_acquire(&self) -> bool {
        match self.state() {
            CircuitState::Closed => {
                self.emit(ConnectionEvent::CallPermitted {
                    target: self.config.name.clone(),
                    timestamp: Instant::now(),
                    state: CircuitState::Closed,
                });
                true
            }
            CircuitState::Open => {
                let elapsed = self.state_since.lock().unwrap().elapsed();
                if elapsed >= self.config.recovery_window {
                    self.transition_to(CircuitState::HalfOpen);
                    self.emit(ConnectionEvent::CallPermitted {
                        target: self.config.name.clone(),
                        timestamp: Instant::now(),
                        state: CircuitState::HalfOpen,
                    });
                    true
                } else {
                    self.emit(ConnectionEvent::CallRejected {
                        target: self.config.name.clone(),
                        timestamp: Instant::now(),
                    });
                    false
                }
            }
            CircuitState::HalfOpen => {
                // Only the one probe call that triggered the transition is
                // allowed through; any racing caller observing half-open
                // afterwards is rejected until that probe resolves.
                self.emit(ConnectionEvent::CallRejected {
                    target: self.config.name.clone(),
                    timestamp: Instant::now(),
                });
                false
            }
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        if self.state() == CircuitState::HalfOpen {
            self.transition_to(CircuitState::Closed);
        }
    }

    pub fn record_failure(&self) {
        match self.state() {
            CircuitState::HalfOpen => {
                self.transition_to(CircuitState::Open);
            }
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.config.failure_threshold {
                    self.transition_to(CircuitState::Open);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn force_open(&self) {
        self.transition_to(CircuitState::Open);
    }

    pub fn force_closed(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        self.transition_to(CircuitState::Closed);
    }

    fn transition_to(&self, next: CircuitState) {
        let prev = self.state();
        if prev == next {
            return;
        }
        self.state.store(next as u8, Ordering::Release);
        *self.state_since.lock().unwrap() = Instant::now();
        if next == CircuitState::Closed {
            self.consecutive_failures.store(0, Ordering::Release);
        }

        tracing::info!(target = %self.config.name, from = ?prev, to = ?next, "circuit state transition");

        #[cfg(feature = "metrics")]
        {
            counter!("driftwatch_connection_circuit_transitions_total", "target" => self.config.name.clone()).increment(1);
            gauge!("driftwatch_connection_circuit_state", "target" => self.config.name.clone())
                .set(next as u8 as f64);
        }

        self.emit(ConnectionEvent::StateTransition {
            target: self.config.name.clone(),
            timestamp: Instant::now(),
            from_state: prev,
            to_state: next,
        });
    }

    fn emit(&self, event: ConnectionEvent) {
        self.event_listeners.emit(&event);
    }
}

/// Lets `driftwatch-health` force a breaker open/closed directly, instead of
/// waiting for the next failed call to trip it.
impl HealthTriggerable for Circuit {
    fn trigger_unhealthy(&self) {
        self.force_open();
    }

    fn trigger_healthy(&self) {
        self.force_closed();
    }

    fn trigger_degraded(&self) {}
}

pub(crate) fn trigger_health(circuit: &Arc<Circuit>, health: TriggerHealth) {
    match health {
        TriggerHealth::Healthy => circuit.trigger_healthy(),
        TriggerHealth::Unhealthy => circuit.trigger_unhealthy(),
        TriggerHealth::Degraded => circuit.trigger_degraded(),
    }
}
