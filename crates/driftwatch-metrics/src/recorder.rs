//! Per-plugin counters: the bookkeeping `record_success`/`record_error`
//! update directly, independent of the periodic pull in [`crate::collector`].

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::snapshot::PluginMetricsSnapshot;

struct Counters {
    snapshot: PluginMetricsSnapshot,
    updated_at: Instant,
}

impl Counters {
    fn new(plugin_name: &str) -> Self {
        Self {
            snapshot: PluginMetricsSnapshot::empty(plugin_name),
            updated_at: Instant::now(),
        }
    }
}

/// Owns the per-plugin counter table behind a single lock. Never acquires
/// another component's lock while holding this one — it sits below the
/// router in the documented lock hierarchy (manager -> queue -> workers ->
/// health -> metrics -> router).
pub struct MetricsRecorder {
    counters: RwLock<BTreeMap<String, Counters>>,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(BTreeMap::new()),
        }
    }

    /// Exponential smoothing per spec.md §4.9: `avg = (avg + sample) / 2`
    /// once an average exists, otherwise the first sample seeds it.
    pub async fn record_success(&self, plugin_name: &str, latency_ms: f64) {
        let mut counters = self.counters.write().await;
        let entry = counters
            .entry(plugin_name.to_string())
            .or_insert_with(|| Counters::new(plugin_name));
        entry.snapshot.total_requests += 1;
        entry.snapshot.successful_requests += 1;
        entry.snapshot.avg_latency_ms = smooth(entry.snapshot.avg_latency_ms, latency_ms);
        entry.snapshot.last_export = Some(Utc::now());
        entry.updated_at = Instant::now();
    }

    pub async fn record_error(&self, plugin_name: &str, latency_ms: f64) {
        let mut counters = self.counters.write().await;
        let entry = counters
            .entry(plugin_name.to_string())
            .or_insert_with(|| Counters::new(plugin_name));
        entry.snapshot.total_requests += 1;
        entry.snapshot.failed_requests += 1;
        entry.snapshot.avg_latency_ms = smooth(entry.snapshot.avg_latency_ms, latency_ms);
        entry.snapshot.last_error = Some(Utc::now());
        entry.updated_at = Instant::now();
    }

    pub async fn snapshot(&self, plugin_name: &str) -> Option<PluginMetricsSnapshot> {
        self.counters
            .read()
            .await
            .get(plugin_name)
            .map(|c| c.snapshot.clone())
    }

    pub async fn all_snapshots(&self) -> Vec<PluginMetricsSnapshot> {
        self.counters
            .read()
            .await
            .values()
            .map(|c| c.snapshot.clone())
            .collect()
    }

    /// Ensures a plugin has a zeroed entry, e.g. right after registration so
    /// `get_plugin_metrics` never returns `None` for a known plugin.
    pub async fn ensure_registered(&self, plugin_name: &str) {
        self.counters
            .write()
            .await
            .entry(plugin_name.to_string())
            .or_insert_with(|| Counters::new(plugin_name));
    }

    pub async fn unregister(&self, plugin_name: &str) {
        self.counters.write().await.remove(plugin_name);
    }

    /// Retention cleanup (spec.md §4.9): entries that have not updated
    /// within `retention` are reset to zero counters, not removed.
    pub async fn reset_stale(&self, retention: Duration) {
        let now = Instant::now();
        let mut counters = self.counters.write().await;
        for (name, entry) in counters.iter_mut() {
            if now.duration_since(entry.updated_at) >= retention {
                tracing::debug!(plugin = %name, "resetting stale metrics to zero");
                entry.snapshot = PluginMetricsSnapshot::empty(name.clone());
                entry.updated_at = now;
            }
        }
    }
}

fn smooth(avg: f64, sample: f64) -> f64 {
    if avg == 0.0 {
        sample
    } else {
        (avg + sample) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_sample_seeds_average_then_smooths() {
        let recorder = MetricsRecorder::new();
        recorder.record_success("file", 100.0).await;
        let snap = recorder.snapshot("file").await.unwrap();
        assert_eq!(snap.avg_latency_ms, 100.0);

        recorder.record_success("file", 200.0).await;
        let snap = recorder.snapshot("file").await.unwrap();
        assert_eq!(snap.avg_latency_ms, 150.0);
    }

    #[tokio::test]
    async fn error_rate_derives_from_counters() {
        let recorder = MetricsRecorder::new();
        recorder.record_success("file", 10.0).await;
        recorder.record_error("file", 10.0).await;
        recorder.record_error("file", 10.0).await;
        let snap = recorder.snapshot("file").await.unwrap();
        assert_eq!(snap.total_requests, 3);
        assert!((snap.error_rate() - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stale_entries_reset_to_zero_but_stay_present() {
        let recorder = MetricsRecorder::new();
        recorder.record_success("file", 10.0).await;
        recorder.reset_stale(Duration::from_secs(0)).await;
        let snap = recorder.snapshot("file").await.unwrap();
        assert_eq!(snap.total_requests, 0);
    }
}
