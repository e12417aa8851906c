//! Export plugin runtime: queue, worker pool, router-backed dispatch, and
//! health/metrics registration for every plugin the manager owns.
//!
//! `driftwatch-export` is the one crate in the workspace that depends on
//! every other export-adjacent crate (`driftwatch-router`,
//! `driftwatch-health`, `driftwatch-metrics`, `driftwatch-bulkhead`,
//! `driftwatch-executor`) — it is the composition root, not a leaf.

pub mod context;
pub mod error;
pub mod job;
pub mod manager;
pub mod plugin;
pub mod queue;
pub mod worker;

#[cfg(feature = "plugin-file")]
pub mod plugins_file;
#[cfg(feature = "plugin-otel")]
pub mod plugins_otel;
#[cfg(feature = "plugin-prometheus")]
pub mod plugins_prometheus;

pub use context::ExportContext;
pub use error::ExportError;
pub use job::{ExportJob, JOB_TIMEOUT, MAX_RETRIES};
pub use manager::{Manager, ManagerConfig};
pub use plugin::{ExportPlugin, MetricsSourceAdapter, ProbeableAdapter};
pub use queue::Queue;
pub use worker::WorkerPool;

#[cfg(test)]
mod integration_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use driftwatch_executor::Executor;
    use driftwatch_health::HealthStatus;
    use driftwatch_model::{ConfigValue, DataType, ExportRequest, ExportStatus};
    use futures::future::BoxFuture;

    use crate::context::ExportContext;
    use crate::error::ExportError;
    use crate::manager::{Manager, ManagerConfig};
    use crate::plugin::ExportPlugin;

    struct DelayedPlugin {
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ExportPlugin for DelayedPlugin {
        fn name(&self) -> &str {
            "delayed"
        }

        fn supported_formats(&self) -> Vec<String> {
            vec!["json".to_string()]
        }

        fn initialize(&self, _ctx: &ExportContext) -> BoxFuture<'_, Result<(), ExportError>> {
            Box::pin(async { Ok(()) })
        }

        fn validate(&self) -> BoxFuture<'_, Result<(), ExportError>> {
            Box::pin(async { Ok(()) })
        }

        fn start(&self) -> BoxFuture<'_, Result<(), ExportError>> {
            Box::pin(async { Ok(()) })
        }

        fn stop(&self) -> BoxFuture<'_, Result<(), ExportError>> {
            Box::pin(async { Ok(()) })
        }

        fn export(
            &self,
            _ctx: &ExportContext,
            request: ExportRequest,
        ) -> BoxFuture<'_, Result<driftwatch_model::ExportResponse, ExportError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.delay;
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                let mut response = driftwatch_model::ExportResponse::pending(request.id);
                response.status = ExportStatus::Completed;
                Ok(response)
            })
        }

        fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
            Box::pin(async { HealthStatus::Healthy })
        }

        fn update_config(&self, _settings: ConfigValue) -> BoxFuture<'_, Result<(), ExportError>> {
            Box::pin(async { Ok(()) })
        }
    }

    /// Scenario S6: async export happy path — enqueue, background dispatch
    /// picks it up, and `get_status` observes `completed` within 500ms.
    #[tokio::test]
    async fn scenario_s6_async_export_completes() {
        let manager = Manager::new(tokio::runtime::Handle::current(), ManagerConfig::default());
        let plugin = Arc::new(DelayedPlugin {
            delay: Duration::from_millis(100),
            calls: AtomicUsize::new(0),
        });
        manager.register_plugin(plugin).await.unwrap();
        manager.start().await;

        let request = ExportRequest::new("json", DataType::Snapshot, ConfigValue::Null);
        let id = manager.export_async(request).await.unwrap();

        let deadline = std::time::Instant::now() + Duration::from_millis(500);
        loop {
            let status = manager.get_status(&id).await.unwrap();
            if status.status == ExportStatus::Completed {
                assert!(status.duration_ms.unwrap_or(0) > 0);
                break;
            }
            assert!(std::time::Instant::now() < deadline, "export did not complete in time");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        manager.stop().await;
    }

    /// Invariant 5: status only ever moves pending -> processing ->
    /// {completed|failed|cancelled}, never backwards or sideways.
    #[tokio::test]
    async fn invariant_status_transitions_are_forward_only() {
        let manager = Manager::new(tokio::runtime::Handle::current(), ManagerConfig::default());
        let plugin = Arc::new(DelayedPlugin {
            delay: Duration::from_millis(20),
            calls: AtomicUsize::new(0),
        });
        manager.register_plugin(plugin).await.unwrap();
        manager.start().await;

        let request = ExportRequest::new("json", DataType::Snapshot, ConfigValue::Null);
        let id = manager.export_async(request).await.unwrap();

        let mut seen = Vec::new();
        let deadline = std::time::Instant::now() + Duration::from_millis(500);
        loop {
            let status = manager.get_status(&id).await.unwrap().status;
            if seen.last() != Some(&status) {
                seen.push(status);
            }
            if status == ExportStatus::Completed {
                break;
            }
            assert!(std::time::Instant::now() < deadline);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(seen == vec![ExportStatus::Pending, ExportStatus::Processing, ExportStatus::Completed]
            || seen == vec![ExportStatus::Processing, ExportStatus::Completed]);

        manager.stop().await;
    }
}
