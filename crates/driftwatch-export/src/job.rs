//! An [`ExportJob`]: one attempt at delivering a routed request to its
//! plugin, with the retry bookkeeping spec.md §4.6 attaches to it.

use std::time::Duration;

use driftwatch_model::ExportRequest;

/// Per-job timeout (spec.md §4.6).
pub const JOB_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum retries before a job is surfaced as `failed`.
pub const MAX_RETRIES: u32 = 3;

#[derive(Clone)]
pub struct ExportJob {
    pub request: ExportRequest,
    pub plugin_name: String,
    pub retry_count: u32,
}

impl ExportJob {
    pub fn new(request: ExportRequest, plugin_name: impl Into<String>) -> Self {
        Self {
            request,
            plugin_name: plugin_name.into(),
            retry_count: 0,
        }
    }

    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= MAX_RETRIES
    }

    /// Linear backoff: `retry_count × 1s` (spec.md §4.6).
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.retry_count as u64)
    }

    pub fn next_attempt(&self) -> Self {
        Self {
            request: self.request.clone(),
            plugin_name: self.plugin_name.clone(),
            retry_count: self.retry_count + 1,
        }
    }
}
