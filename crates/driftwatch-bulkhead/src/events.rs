//! Event types emitted by a bulkhead as calls are permitted, rejected, and
//! completed. Wired into the shared [`driftwatch_core::events`] listener
//! mechanism so the collector fan-out and export worker pool can both
//! observe bulkhead pressure without polling.

use driftwatch_core::events::DriftEvent;
use std::time::{Duration, Instant};

/// An event emitted by a [`crate::Bulkhead`] over the lifetime of one call.
#[derive(Debug, Clone)]
pub enum BulkheadEvent {
    /// A call acquired a permit and is proceeding to the inner service.
    CallPermitted {
        pattern_name: String,
        timestamp: Instant,
        /// Number of concurrent calls in flight after this one was admitted.
        concurrent_calls: usize,
    },
    /// A call was turned away because the bulkhead was at capacity.
    CallRejected {
        pattern_name: String,
        timestamp: Instant,
        max_concurrent_calls: usize,
    },
    /// A permitted call completed without error and released its permit.
    CallFinished {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// A permitted call completed with an error and released its permit.
    CallFailed {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
}

impl DriftEvent for BulkheadEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BulkheadEvent::CallPermitted { .. } => "call_permitted",
            BulkheadEvent::CallRejected { .. } => "call_rejected",
            BulkheadEvent::CallFinished { .. } => "call_finished",
            BulkheadEvent::CallFailed { .. } => "call_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            BulkheadEvent::CallPermitted { timestamp, .. }
            | BulkheadEvent::CallRejected { timestamp, .. }
            | BulkheadEvent::CallFinished { timestamp, .. }
            | BulkheadEvent::CallFailed { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            BulkheadEvent::CallPermitted { pattern_name, .. }
            | BulkheadEvent::CallRejected { pattern_name, .. }
            | BulkheadEvent::CallFinished { pattern_name, .. }
            | BulkheadEvent::CallFailed { pattern_name, .. } => pattern_name,
        }
    }
}

impl BulkheadEvent {
    /// Convenience accessor matching the crate's historical `pattern_name()`
    /// call sites (a thin wrapper over [`DriftEvent::source_name`]).
    pub fn pattern_name(&self) -> &str {
        self.source_name()
    }
}
