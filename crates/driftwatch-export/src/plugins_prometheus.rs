//! The reference `prometheus` export plugin: serves the current metrics
//! rollup in Prometheus text exposition format (spec.md §6), sourced from
//! the same [`driftwatch_metrics::MetricsRecorder`] the manager updates on
//! every export.

use std::sync::Arc;

use chrono::Utc;
use driftwatch_health::HealthStatus;
use driftwatch_metrics::MetricsRecorder;
use driftwatch_model::{ConfigValue, ExportRequest, ExportResponse, ExportStatus};
use futures::future::BoxFuture;

use crate::context::ExportContext;
use crate::error::ExportError;
use crate::plugin::ExportPlugin;

pub struct PrometheusPlugin {
    recorder: Arc<MetricsRecorder>,
}

impl PrometheusPlugin {
    pub fn new(recorder: Arc<MetricsRecorder>) -> Self {
        Self { recorder }
    }
}

impl ExportPlugin for PrometheusPlugin {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn supported_formats(&self) -> Vec<String> {
        vec!["prometheus".to_string()]
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

    fn export(&self, _ctx: &ExportContext, request: ExportRequest) -> BoxFuture<'_, Result<ExportResponse, ExportError>> {
        Box::pin(async move {
            let snapshots = self.recorder.all_snapshots().await;
            let body = driftwatch_metrics::render_all(&snapshots, Utc::now().timestamp_millis());

            let mut response = ExportResponse::pending(request.id);
            response.plugin_name = Some("prometheus".to_string());
            response.status = ExportStatus::Completed;
            response.content_type = Some("text/plain; version=0.0.4".to_string());
            response.data = Some(ConfigValue::String(body));
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
