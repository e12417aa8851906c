//! The export [`Manager`]: the facade spec.md §4.6 describes, composing the
//! plugin registry, router, queue, worker pool, health monitor, and metrics
//! recorder/collector into one lifecycle.
//!
//! Lock discipline: `plugins` is this component's own lock (manager sits
//! first in the documented hierarchy manager -> queue -> workers -> health
//! -> metrics -> router); every read path snapshots under the lock rather
//! than holding it across an `.await` into another component.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use driftwatch_core::CancellationToken;
use driftwatch_executor::Executor;
use driftwatch_health::{HealthStatus, PluginHealthMonitor, SystemHealth, SystemStatus};
use driftwatch_metrics::{MetricsCollector, MetricsRecorder, PluginMetricsSnapshot, SystemMetricsSnapshot};
use driftwatch_model::{ExportRequest, ExportResponse, Route, RoutePattern};
use driftwatch_router::Router;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::context::ExportContext;
use crate::error::ExportError;
use crate::job::ExportJob;
use crate::plugin::{ExportPlugin, MetricsSourceAdapter, ProbeableAdapter};
use crate::queue::Queue;
use crate::worker::WorkerPool;

type PluginMap = Arc<RwLock<HashMap<String, Arc<dyn ExportPlugin>>>>;

pub struct ManagerConfig {
    pub queue_capacity: usize,
    pub max_concurrent_workers: usize,
    pub poll_interval: Duration,
    pub cleanup_interval: Duration,
    pub response_retention: ChronoDuration,
    pub metrics_retention: Duration,
    pub default_plugin: Option<String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_concurrent_workers: 8,
            poll_interval: Duration::from_millis(100),
            cleanup_interval: Duration::from_secs(60),
            response_retention: ChronoDuration::hours(24),
            metrics_retention: Duration::from_secs(24 * 60 * 60),
            default_plugin: None,
        }
    }
}

pub struct Manager<E: Executor> {
    plugins: PluginMap,
    router: Arc<Router>,
    queue: Arc<Queue>,
    workers: WorkerPool<E>,
    health: PluginHealthMonitor,
    metrics_recorder: Arc<MetricsRecorder>,
    metrics_collector: MetricsCollector,
    executor: E,
    running: Arc<RwLock<bool>>,
    shutdown: CancellationToken,
    poll_task: RwLock<Option<JoinHandle<()>>>,
    cleanup_task: RwLock<Option<JoinHandle<()>>>,
    config: ManagerConfig,
}

impl<E: Executor> Manager<E> {
    pub fn new(executor: E, config: ManagerConfig) -> Self {
        let plugins: PluginMap = Arc::new(RwLock::new(HashMap::new()));
        let queue = Arc::new(Queue::new(config.queue_capacity));
        let metrics_recorder = Arc::new(MetricsRecorder::new());
        let workers = WorkerPool::new(
            Arc::clone(&plugins),
            Arc::clone(&queue),
            Arc::clone(&metrics_recorder),
            executor.clone(),
            config.max_concurrent_workers,
        );
        let mut router_builder = Router::builder();
        if let Some(default) = &config.default_plugin {
            router_builder = router_builder.default_plugin(default.clone());
        }

        Self {
            plugins,
            router: Arc::new(router_builder.build()),
            queue,
            workers,
            health: PluginHealthMonitor::with_defaults(),
            metrics_recorder,
            metrics_collector: MetricsCollector::with_defaults(),
            executor,
            running: Arc::new(RwLock::new(false)),
            shutdown: CancellationToken::new(),
            poll_task: RwLock::new(None),
            cleanup_task: RwLock::new(None),
            config,
        }
    }

    /// `initialize`, `validate`, optionally `start` if the manager is
    /// already running, register default per-format routes, and register
    /// with health + metrics (spec.md §4.6).
    pub async fn register_plugin(&self, plugin: Arc<dyn ExportPlugin>) -> Result<(), ExportError> {
        let name = plugin.name().to_string();
        if self.plugins.read().await.contains_key(&name) {
            return Err(ExportError::AlreadyRegistered(name));
        }

        let ctx = ExportContext::new(self.shutdown.child());
        plugin.initialize(&ctx).await?;
        plugin.validate().await?;
        if *self.running.read().await {
            plugin.start().await?;
        }

        self.plugins.write().await.insert(name.clone(), Arc::clone(&plugin));

        for format in plugin.supported_formats() {
            let route = Route {
                id: format!("{name}-{format}-default"),
                pattern: RoutePattern {
                    format: Some(format),
                    ..Default::default()
                },
                plugin_name: name.clone(),
                priority: 0,
                enabled: true,
                match_count: 0,
                last_matched: None,
            };
            self.router.register(route)?;
        }

        self.health.register(Arc::new(ProbeableAdapter(Arc::clone(&plugin)))).await;
        self.metrics_collector
            .register(Arc::new(MetricsSourceAdapter(Arc::clone(&plugin))))
            .await;
        self.metrics_recorder.ensure_registered(&name).await;

        Ok(())
    }

    /// Stops the plugin, removes it from every registry and route table.
    pub async fn unregister_plugin(&self, name: &str) -> Result<(), ExportError> {
        let plugin = self
            .plugins
            .write()
            .await
            .remove(name)
            .ok_or_else(|| ExportError::PluginNotFound(name.to_string()))?;

        plugin.stop().await?;

        for format in plugin.supported_formats() {
            let pattern = RoutePattern {
                format: Some(format),
                ..Default::default()
            };
            self.router.unregister_by_pattern(&pattern);
        }

        self.health.unregister(name).await;
        self.metrics_collector.unregister(name).await;
        self.metrics_recorder.unregister(name).await;
        Ok(())
    }

    /// Synchronous export: dispatches directly if `request.plugin_name` is
    /// set, otherwise routes. Records metrics and returns the response.
    pub async fn export(&self, request: ExportRequest) -> Result<ExportResponse, ExportError> {
        let plugin_name = match &request.plugin_name {
            Some(name) => name.clone(),
            None => self.router.select(&request)?,
        };

        let plugin = {
            let plugins = self.plugins.read().await;
            plugins
                .get(&plugin_name)
                .cloned()
                .ok_or_else(|| ExportError::PluginNotFound(plugin_name.clone()))?
        };

        let ctx = ExportContext::new(self.shutdown.child());
        let start = std::time::Instant::now();
        let result = plugin.export(&ctx, request).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(response) => {
                self.metrics_recorder.record_success(&plugin_name, elapsed_ms).await;
                Ok(response)
            }
            Err(err) => {
                self.metrics_recorder.record_error(&plugin_name, elapsed_ms).await;
                Err(err)
            }
        }
    }

    /// Enqueues the request for async processing; returns the id the caller
    /// polls via [`Manager::get_status`].
    pub async fn export_async(&self, request: ExportRequest) -> Result<String, ExportError> {
        self.queue.enqueue(request).await
    }

    pub async fn get_status(&self, id: &str) -> Option<ExportResponse> {
        self.queue.status(id).await
    }

    /// Honored only while the request is still `pending` (spec.md §4.6).
    pub async fn cancel(&self, id: &str) -> Result<(), ExportError> {
        self.queue.cancel(id).await
    }

    pub async fn list_plugins(&self) -> Vec<String> {
        self.plugins.read().await.keys().cloned().collect()
    }

    /// The formats a registered plugin declares support for, used by
    /// `driftwatch-reload` to rebuild default routes without reaching into
    /// the plugin map directly.
    pub async fn supported_formats(&self, name: &str) -> Option<Vec<String>> {
        self.plugins.read().await.get(name).map(|p| p.supported_formats())
    }

    /// Pushes new settings into an already-registered plugin. Used by
    /// `driftwatch-reload` when a plugin named in the canonical config
    /// already exists; reload never constructs plugins itself (spec.md
    /// §4.10: dynamic instantiation from config is unsupported).
    pub async fn update_plugin_config(
        &self,
        name: &str,
        settings: driftwatch_model::ConfigValue,
    ) -> Result<(), ExportError> {
        let plugin = {
            let plugins = self.plugins.read().await;
            plugins
                .get(name)
                .cloned()
                .ok_or_else(|| ExportError::PluginNotFound(name.to_string()))?
        };
        plugin.update_config(settings).await
    }

    pub async fn get_plugin_health(&self, name: &str) -> Option<HealthStatus> {
        self.health.status_of(name).await
    }

    pub async fn get_system_health(&self) -> (SystemStatus, Option<SystemHealth>) {
        (self.health.system_status().await, self.health.system_health().await)
    }

    pub async fn get_plugin_metrics(&self, name: &str) -> Option<PluginMetricsSnapshot> {
        self.metrics_recorder.snapshot(name).await
    }

    pub async fn get_system_metrics(&self) -> SystemMetricsSnapshot {
        driftwatch_metrics::system_metrics(&self.metrics_recorder.all_snapshots().await)
    }

    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.router)
    }

    /// Starts already-registered plugins, the health monitor, the metrics
    /// collector, the 100ms dispatch loop, and the 60s cleanup loop.
    pub async fn start(&self) {
        *self.running.write().await = true;

        for plugin in self.plugins.read().await.values() {
            if let Err(err) = plugin.start().await {
                tracing::warn!(plugin = plugin.name(), error = %err, "plugin failed to start");
            }
        }

        self.health.start().await;
        self.metrics_collector.start().await;

        *self.poll_task.write().await = Some(self.spawn_poll_loop());
        *self.cleanup_task.write().await = Some(self.spawn_cleanup_loop());
    }

    fn spawn_poll_loop(&self) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let router = Arc::clone(&self.router);
        let workers = self.workers.clone();
        let shutdown = self.shutdown.clone();
        let poll_interval = self.config.poll_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }

                while let Some(request) = queue.dequeue_next().await {
                    let plugin_name = match request.plugin_name.clone() {
                        Some(name) => Ok(name),
                        None => router.select(&request),
                    };

                    match plugin_name {
                        Ok(plugin_name) => {
                            if queue.mark_processing(&request.id).await.is_ok() {
                                workers.submit(ExportJob::new(request, plugin_name));
                            }
                        }
                        Err(_) => {
                            let id = request.id.clone();
                            let _ = queue.mark_processing(&id).await;
                            let mut response = driftwatch_model::ExportResponse::pending(id.clone());
                            response.status = driftwatch_model::ExportStatus::Failed;
                            response.error = Some("no route matched this request".to_string());
                            let _ = queue.complete(&id, response).await;
                        }
                    }
                }
            }
        })
    }

    fn spawn_cleanup_loop(&self) -> JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let metrics_recorder = Arc::clone(&self.metrics_recorder);
        let shutdown = self.shutdown.clone();
        let cleanup_interval = self.config.cleanup_interval;
        let response_retention = self.config.response_retention;
        let metrics_retention = self.config.metrics_retention;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }
                queue.cleanup(response_retention).await;
                metrics_recorder.reset_stale(metrics_retention).await;
            }
        })
    }

    /// Shutdown order (spec.md §4.6): close the shutdown latch, stop
    /// plugins, drain the worker pool, then the queue (no channels to close
    /// in this implementation — the queue is lock-guarded, not channel-based
    /// — so "closing" it is simply no longer accepting new dispatch).
    pub async fn stop(&self) {
        self.shutdown.cancel();

        if let Some(task) = self.poll_task.write().await.take() {
            let _ = task.await;
        }

        for plugin in self.plugins.read().await.values() {
            if let Err(err) = plugin.stop().await {
                tracing::warn!(plugin = plugin.name(), error = %err, "plugin failed to stop cleanly");
            }
        }

        self.workers.drain().await;

        if let Some(task) = self.cleanup_task.write().await.take() {
            task.abort();
        }

        self.health.stop().await;
        self.metrics_collector.stop().await;
        *self.running.write().await = false;
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}
