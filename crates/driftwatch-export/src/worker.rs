//! The worker pool: bounded concurrency over plugin `export` calls.
//!
//! Grounded in `tower-resilience-bulkhead` for concurrency bounding and
//! `tower-resilience-executor`'s `Executor` trait for spawning, replacing
//! the source's "goroutine-per-worker" pool (spec.md §9 redesign note) with
//! a first-class lifecycle: each submitted job is one spawned task that
//! owns its own retry loop, not a worker goroutine pulling from a shared
//! channel — the result handler (this task) decides whether to retry, the
//! worker (the bulkhead-bounded service call) only ever runs one attempt.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use driftwatch_bulkhead::BulkheadLayer;
use driftwatch_executor::Executor;
use driftwatch_model::{ExportResponse, ExportStatus};
use tokio::sync::RwLock;
use tower::util::BoxCloneService;
use tower::{Layer, ServiceExt};

use crate::context::ExportContext;
use crate::error::ExportError;
use crate::job::{ExportJob, JOB_TIMEOUT};
use crate::plugin::ExportPlugin;
use crate::queue::Queue;

type PluginMap = Arc<RwLock<HashMap<String, Arc<dyn ExportPlugin>>>>;
type JobService = BoxCloneService<ExportJob, ExportResponse, ExportError>;

pub struct WorkerPool<E: Executor> {
    service: JobService,
    queue: Arc<Queue>,
    metrics: Arc<driftwatch_metrics::MetricsRecorder>,
    executor: E,
    in_flight: Arc<AtomicUsize>,
}

impl<E: Executor> Clone for WorkerPool<E> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            queue: Arc::clone(&self.queue),
            metrics: Arc::clone(&self.metrics),
            executor: self.executor.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<E: Executor> WorkerPool<E> {
    pub fn new(
        plugins: PluginMap,
        queue: Arc<Queue>,
        metrics: Arc<driftwatch_metrics::MetricsRecorder>,
        executor: E,
        max_concurrent_workers: usize,
    ) -> Self {
        let svc = tower::service_fn(move |job: ExportJob| {
            let plugins = Arc::clone(&plugins);
            async move {
                let plugin = {
                    let guard = plugins.read().await;
                    guard.get(&job.plugin_name).cloned()
                };
                let plugin = plugin.ok_or_else(|| ExportError::PluginNotFound(job.plugin_name.clone()))?;
                let ctx = ExportContext::default();
                match tokio::time::timeout(JOB_TIMEOUT, plugin.export(&ctx, job.request.clone())).await {
                    Ok(Ok(response)) => Ok(response),
                    Ok(Err(err)) => Err(err),
                    Err(_) => Err(ExportError::Timeout {
                        plugin: job.plugin_name.clone(),
                        timeout_ms: JOB_TIMEOUT.as_millis() as u64,
                    }),
                }
            }
        });

        let layer = BulkheadLayer::builder()
            .max_concurrent_calls(max_concurrent_workers)
            .name("export-worker-pool")
            .build();
        let service: JobService = BoxCloneService::new(layer.layer(svc));

        Self {
            service,
            queue,
            metrics,
            executor,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Submits a job; retries on failure with a `retry_count × 1s` linear
    /// backoff until `MAX_RETRIES` is exhausted, at which point the result is
    /// written back to the queue as `failed`.
    pub fn submit(&self, job: ExportJob) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let service = self.service.clone();
        let queue = Arc::clone(&self.queue);
        let metrics = Arc::clone(&self.metrics);
        let in_flight = Arc::clone(&self.in_flight);

        self.executor.spawn(async move {
            let mut job = job;
            loop {
                let start = Instant::now();
                let outcome = service.clone().oneshot(job.clone()).await;
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

                match outcome {
                    Ok(mut response) => {
                        response.duration_ms = Some(elapsed_ms as u64);
                        response.processed_at = Some(Utc::now());
                        response.status = ExportStatus::Completed;
                        metrics.record_success(&job.plugin_name, elapsed_ms).await;
                        let _ = queue.complete(&job.request.id, response).await;
                        break;
                    }
                    Err(err) => {
                        metrics.record_error(&job.plugin_name, elapsed_ms).await;
                        if job.retries_exhausted() {
                            tracing::warn!(plugin = %job.plugin_name, request = %job.request.id, error = %err, "export job retries exhausted");
                            let mut response = ExportResponse::pending(job.request.id.clone());
                            response.status = ExportStatus::Failed;
                            response.plugin_name = Some(job.plugin_name.clone());
                            response.error = Some(err.to_string());
                            response.processed_at = Some(Utc::now());
                            let _ = queue.complete(&job.request.id, response).await;
                            break;
                        }
                        tokio::time::sleep(job.backoff()).await;
                        job = job.next_attempt();
                    }
                }
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
    }

    /// Waits for every submitted job (including its retries) to reach a
    /// terminal state. Used by `Manager::stop`'s drain step.
    pub async fn drain(&self) {
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}
