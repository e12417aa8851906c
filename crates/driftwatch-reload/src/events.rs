//! [`ReloadEvent`]: emitted once per completed reload cycle, success or
//! failure, so the rest of the system can observe reloads without polling
//! [`crate::Reloader::reload_count`].

use std::time::Instant;

use driftwatch_core::events::DriftEvent;

use crate::reconcile::ReloadOutcome;

#[derive(Debug, Clone)]
pub enum ReloadEvent {
    /// The configuration file's content hash changed and reload applied
    /// cleanly.
    Applied {
        reload_count: u64,
        outcome: ReloadOutcome,
        timestamp: Instant,
    },
    /// A change was detected but reconciliation failed partway through; the
    /// previously-applied configuration remains the live one (spec.md
    /// §4.10: "failures anywhere in the sequence abort the reload but leave
    /// the previous configuration intact").
    Failed {
        reason: String,
        timestamp: Instant,
    },
}

impl DriftEvent for ReloadEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReloadEvent::Applied { .. } => "config_reload_applied",
            ReloadEvent::Failed { .. } => "config_reload_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ReloadEvent::Applied { timestamp, .. } => *timestamp,
            ReloadEvent::Failed { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        "driftwatch-reload"
    }
}
