//! Externally observable plugin and circuit-breaker lifecycle states.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginLifecycle {
    NotRegistered,
    Initialized,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthOverlay {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginState {
    pub lifecycle: PluginLifecycle,
    pub health: HealthOverlay,
}

impl PluginState {
    pub fn new() -> Self {
        Self {
            lifecycle: PluginLifecycle::NotRegistered,
            health: HealthOverlay::Unknown,
        }
    }
}

impl Default for PluginState {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-target circuit breaker state, as observed from outside the breaker
/// implementation in `driftwatch-connection` (that crate owns the state
/// machine; this is the plain-data snapshot other crates consult).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitBreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitBreakerState,
    pub failure_count: u32,
    pub last_failure: Option<Instant>,
    pub recovery_deadline: Option<Instant>,
}

impl CircuitBreakerSnapshot {
    pub fn closed() -> Self {
        Self {
            state: CircuitBreakerState::Closed,
            failure_count: 0,
            last_failure: None,
            recovery_deadline: None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, CircuitBreakerState::Open)
    }

    pub fn recovery_remaining(&self) -> Option<Duration> {
        self.recovery_deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}
