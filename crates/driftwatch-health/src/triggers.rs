//! Health-triggered notifications for resilience patterns.
//!
//! This module provides the integration between health checking and
//! resilience patterns like circuit breakers.

use crate::HealthStatus;
use driftwatch_core::{SharedHealthTrigger, TriggerHealth};

impl From<HealthStatus> for TriggerHealth {
    fn from(status: HealthStatus) -> Self {
        match status {
            HealthStatus::Healthy => TriggerHealth::Healthy,
            HealthStatus::Degraded => TriggerHealth::Degraded,
            HealthStatus::Unhealthy | HealthStatus::Unknown => TriggerHealth::Unhealthy,
        }
    }
}

/// Notifies all triggers when health status changes.
///
/// Only sends notifications when the effective trigger status changes
/// (e.g., Healthy -> Unhealthy), not on every health check.
pub fn notify_triggers(
    triggers: &[SharedHealthTrigger],
    from: HealthStatus,
    to: HealthStatus,
) {
    let from_trigger = TriggerHealth::from(from);
    let to_trigger = TriggerHealth::from(to);

    // No effective change in trigger status
    if from_trigger == to_trigger {
        return;
    }

    for trigger in triggers {
        match to_trigger {
            TriggerHealth::Healthy => trigger.trigger_healthy(),
            TriggerHealth::Degraded => trigger.trigger_degraded(),
            TriggerHealth::Unhealthy => trigger.trigger_unhealthy(),
        }
    }
}
