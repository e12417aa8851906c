//! The reference `otel` export plugin: groups requests by resource
//! attributes (`service.name`, `service.version`, `deployment.environment`)
//! into an OTEL-shaped payload (spec.md §6), batching small requests and
//! flushing either on a size threshold or explicitly via [`OtelPlugin::flush`].
//!
//! spec.md §9 flags a latent bug in the source: the batch processor's
//! size-triggered flush spawns an async task holding a nil plugin
//! reference in one code path. The fix here is structural, not a null
//! check: the flush task is spawned with an owned `Arc<OtelInner>` cloned
//! from `self.inner`, so there is no code path that can construct the task
//! without a live reference to the thing it flushes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use driftwatch_health::HealthStatus;
use driftwatch_model::{ConfigValue, DataType, ExportRequest, ExportResponse, ExportStatus};
use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::context::ExportContext;
use crate::error::ExportError;
use crate::plugin::ExportPlugin;

const DEFAULT_BATCH_SIZE: usize = 20;

struct OtelInner {
    service_name: String,
    service_version: String,
    deployment_environment: String,
    batch_size: usize,
    batch: Mutex<Vec<ExportRequest>>,
    flushes: AtomicUsize,
    buffered_sum: AtomicUsize,
}

impl OtelInner {
    fn resource_attributes(&self) -> BTreeMap<String, ConfigValue> {
        let mut attrs = BTreeMap::new();
        attrs.insert("service.name".to_string(), ConfigValue::String(self.service_name.clone()));
        attrs.insert(
            "service.version".to_string(),
            ConfigValue::String(self.service_version.clone()),
        );
        attrs.insert(
            "deployment.environment".to_string(),
            ConfigValue::String(self.deployment_environment.clone()),
        );
        attrs
    }

    /// Builds the OTEL-shaped envelope for one batch: traces/metrics/logs
    /// grouped under one `resource` block, with a trace event attached for
    /// every request whose data carries a `severity: "high"` field.
    fn compose(&self, batch: &[ExportRequest]) -> ConfigValue {
        let mut traces = Vec::new();
        let mut metrics = Vec::new();
        let mut logs = Vec::new();

        for request in batch {
            match request.data_type {
                DataType::Metrics => metrics.push(request_to_metric(request)),
                DataType::Events | DataType::Alert => traces.push(request_to_span(request)),
                _ => logs.push(request_to_log(request)),
            }
        }

        let mut payload = BTreeMap::new();
        payload.insert(
            "resource".to_string(),
            ConfigValue::Map(self.resource_attributes()),
        );
        payload.insert("traces".to_string(), ConfigValue::List(traces));
        payload.insert("metrics".to_string(), ConfigValue::List(metrics));
        payload.insert("logs".to_string(), ConfigValue::List(logs));
        ConfigValue::Map(payload)
    }

    async fn flush_batch(self: Arc<Self>, batch: Vec<ExportRequest>) -> ConfigValue {
        let payload = self.compose(&batch);
        self.flushes.fetch_add(1, Ordering::SeqCst);
        payload
    }
}

fn is_high_severity(data: &ConfigValue) -> bool {
    match data {
        ConfigValue::Map(fields) => matches!(
            fields.get("severity"),
            Some(ConfigValue::String(s)) if s == "high"
        ),
        _ => false,
    }
}

fn request_to_span(request: &ExportRequest) -> ConfigValue {
    let mut span = BTreeMap::new();
    span.insert("id".to_string(), ConfigValue::String(request.id.clone()));
    span.insert(
        "data_type".to_string(),
        ConfigValue::String(format!("{:?}", request.data_type)),
    );
    if is_high_severity(&request.data) {
        let mut event = BTreeMap::new();
        event.insert("name".to_string(), ConfigValue::String("high-severity-finding".to_string()));
        span.insert("events".to_string(), ConfigValue::List(vec![ConfigValue::Map(event)]));
    }
    ConfigValue::Map(span)
}

fn request_to_metric(request: &ExportRequest) -> ConfigValue {
    let mut metric = BTreeMap::new();
    metric.insert("id".to_string(), ConfigValue::String(request.id.clone()));
    metric.insert("data".to_string(), request.data.clone());
    ConfigValue::Map(metric)
}

fn request_to_log(request: &ExportRequest) -> ConfigValue {
    let mut log = BTreeMap::new();
    log.insert("id".to_string(), ConfigValue::String(request.id.clone()));
    log.insert(
        "data_type".to_string(),
        ConfigValue::String(format!("{:?}", request.data_type)),
    );
    log.insert("body".to_string(), request.data.clone());
    ConfigValue::Map(log)
}

pub struct OtelPlugin {
    inner: Arc<OtelInner>,
}

impl OtelPlugin {
    pub fn new(
        service_name: impl Into<String>,
        service_version: impl Into<String>,
        deployment_environment: impl Into<String>,
    ) -> Self {
        Self::with_batch_size(service_name, service_version, deployment_environment, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(
        service_name: impl Into<String>,
        service_version: impl Into<String>,
        deployment_environment: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            inner: Arc::new(OtelInner {
                service_name: service_name.into(),
                service_version: service_version.into(),
                deployment_environment: deployment_environment.into(),
                batch_size: batch_size.max(1),
                batch: Mutex::new(Vec::new()),
                flushes: AtomicUsize::new(0),
                buffered_sum: AtomicUsize::new(0),
            }),
        }
    }

    pub fn flush_count(&self) -> usize {
        self.inner.flushes.load(Ordering::SeqCst)
    }

    /// Flushes whatever is currently buffered, regardless of batch size.
    /// Used at shutdown so a partial batch isn't silently dropped.
    pub async fn flush(&self) -> ConfigValue {
        let batch = std::mem::take(&mut *self.inner.batch.lock().await);
        Arc::clone(&self.inner).flush_batch(batch).await
    }
}

impl ExportPlugin for OtelPlugin {
    fn name(&self) -> &str {
        "otel"
    }

    fn supported_formats(&self) -> Vec<String> {
        vec!["otel".to_string(), "otlp".to_string()]
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
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let batch = std::mem::take(&mut *inner.batch.lock().await);
            if !batch.is_empty() {
                inner.flush_batch(batch).await;
            }
            Ok(())
        })
    }

    fn export(
        &self,
        _ctx: &ExportContext,
        request: ExportRequest,
    ) -> BoxFuture<'_, Result<ExportResponse, ExportError>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let id = request.id.clone();
            let threshold_hit = {
                let mut batch = inner.batch.lock().await;
                batch.push(request);
                batch.len() >= inner.batch_size
            };

            if threshold_hit {
                let drained = {
                    let mut batch = inner.batch.lock().await;
                    std::mem::take(&mut *batch)
                };
                // The owning Arc is cloned explicitly here, never
                // constructed from a detached/null reference: this is the
                // fix for the batch-flush bug spec.md §9 calls out.
                let owner = Arc::clone(&inner);
                tokio::spawn(owner.flush_batch(drained));
            }

            let mut response = ExportResponse::pending(id);
            response.plugin_name = Some("otel".to_string());
            response.status = ExportStatus::Completed;
            response.content_type = Some("application/json".to_string());
            response.processed_at = Some(Utc::now());
            Ok(response)
        })
    }

    fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
        Box::pin(async { HealthStatus::Healthy })
    }

    fn get_metrics(&self) -> BoxFuture<'_, BTreeMap<String, ConfigValue>> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let buffered = inner.batch.lock().await.len();
            inner.buffered_sum.store(buffered, Ordering::SeqCst);
            let mut metrics = BTreeMap::new();
            metrics.insert("buffered".to_string(), ConfigValue::Number(buffered as f64));
            metrics.insert(
                "flushes".to_string(),
                ConfigValue::Number(inner.flushes.load(Ordering::SeqCst) as f64),
            );
            metrics
        })
    }

    fn update_config(&self, _settings: ConfigValue) -> BoxFuture<'_, Result<(), ExportError>> {
        Box::pin(async { Ok(()) })
    }
}
