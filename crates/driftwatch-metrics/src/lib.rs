//! System-wide export metrics aggregation.
//!
//! Grounded in the `metrics`-feature code paths scattered through the
//! connection layer (`counter!`/`histogram!`/`gauge!`), centralized here
//! into the per-plugin + system-wide aggregator spec.md describes, plus a
//! Prometheus text-exposition writer shared with the `prometheus` export
//! plugin in `driftwatch-export`.

pub mod collector;
pub mod prometheus;
pub mod recorder;
pub mod snapshot;

pub use collector::{MetricsCollector, MetricsSource};
pub use prometheus::{render, render_all, samples_for_snapshot, MetricSample, MetricType};
pub use recorder::MetricsRecorder;
pub use snapshot::{PluginMetricsSnapshot, SystemMetricsSnapshot};

/// Derives the system-wide rollup from every plugin's current snapshot.
pub fn system_metrics(snapshots: &[PluginMetricsSnapshot]) -> SystemMetricsSnapshot {
    SystemMetricsSnapshot {
        total_requests: snapshots.iter().map(|s| s.total_requests).sum(),
        successful_requests: snapshots.iter().map(|s| s.successful_requests).sum(),
        failed_requests: snapshots.iter().map(|s| s.failed_requests).sum(),
        plugin_count: snapshots.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_metrics_sums_across_plugins() {
        let snapshots = vec![
            PluginMetricsSnapshot {
                plugin_name: "a".to_string(),
                total_requests: 5,
                successful_requests: 4,
                failed_requests: 1,
                avg_latency_ms: 0.0,
                last_export: None,
                last_error: None,
            },
            PluginMetricsSnapshot {
                plugin_name: "b".to_string(),
                total_requests: 2,
                successful_requests: 2,
                failed_requests: 0,
                avg_latency_ms: 0.0,
                last_export: None,
                last_error: None,
            },
        ];
        let system = system_metrics(&snapshots);
        assert_eq!(system.total_requests, 7);
        assert_eq!(system.plugin_count, 2);
    }
}
