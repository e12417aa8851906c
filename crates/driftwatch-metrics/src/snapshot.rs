//! The metrics shape reported back to callers (`Manager::get_plugin_metrics`,
//! `get_system_metrics`) and written out by the Prometheus exposition writer.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct PluginMetricsSnapshot {
    pub plugin_name: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_latency_ms: f64,
    pub last_export: Option<DateTime<Utc>>,
    pub last_error: Option<DateTime<Utc>>,
}

impl PluginMetricsSnapshot {
    pub fn empty(plugin_name: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            avg_latency_ms: 0.0,
            last_export: None,
            last_error: None,
        }
    }

    /// Derived, not stored: `failed_requests / total_requests`, zero when no
    /// requests have been recorded yet.
    pub fn error_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.failed_requests as f64 / self.total_requests as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemMetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub plugin_count: usize,
}
