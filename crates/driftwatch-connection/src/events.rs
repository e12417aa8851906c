use std::time::Instant;

use driftwatch_core::DriftEvent;

use crate::circuit::CircuitState;

/// Events emitted by the connection layer so `driftwatch-health` and
/// `driftwatch-metrics` can subscribe instead of polling.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    StateTransition {
        target: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    CallPermitted {
        target: String,
        timestamp: Instant,
        state: CircuitState,
    },
    CallRejected {
        target: String,
        timestamp: Instant,
    },
    RetryAttempted {
        target: String,
        timestamp: Instant,
        attempt: usize,
        delay_ms: u64,
    },
    RetryExhausted {
        target: String,
        timestamp: Instant,
        attempts: usize,
    },
}

impl DriftEvent for ConnectionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ConnectionEvent::StateTransition { .. } => "state_transition",
            ConnectionEvent::CallPermitted { .. } => "call_permitted",
            ConnectionEvent::CallRejected { .. } => "call_rejected",
            ConnectionEvent::RetryAttempted { .. } => "retry_attempted",
            ConnectionEvent::RetryExhausted { .. } => "retry_exhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ConnectionEvent::StateTransition { timestamp, .. }
            | ConnectionEvent::CallPermitted { timestamp, .. }
            | ConnectionEvent::CallRejected { timestamp, .. }
            | ConnectionEvent::RetryAttempted { timestamp, .. }
            | ConnectionEvent::RetryExhausted { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            ConnectionEvent::StateTransition { target, .. }
            | ConnectionEvent::CallPermitted { target, .. }
            | ConnectionEvent::CallRejected { target, .. }
            | ConnectionEvent::RetryAttempted { target, .. }
            | ConnectionEvent::RetryExhausted { target, .. } => target,
        }
    }
}
