//! The export-side Health Monitor: periodic per-plugin probing, alert
//! dispatch on status transitions, and a separate aggregated `SystemHealth`
//! sampling loop.
//!
//! Generalizes [`crate::HealthCheckWrapper`]'s "one resource, one checker"
//! shape from "pick a healthy one" to "track every plugin's health and
//! notify subscribers when it changes" — the health monitor never selects,
//! it only observes and alerts.

use crate::HealthStatus;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Anything the health monitor can probe: an export plugin, or a test
/// double. Kept deliberately small so `driftwatch-health` never depends on
/// the export runtime's plugin trait.
pub trait Probeable: Send + Sync {
    fn plugin_name(&self) -> &str;
    fn health_check(&self) -> BoxFuture<'_, HealthStatus>;
}

/// Severity of a [`HealthAlert`], derived from the status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// Emitted whenever a plugin's observed health status changes.
#[derive(Debug, Clone)]
pub struct HealthAlert {
    pub plugin_name: String,
    pub previous: HealthStatus,
    pub current: HealthStatus,
    pub severity: AlertSeverity,
    pub timestamp_millis: u64,
}

impl HealthAlert {
    fn severity_for(previous: HealthStatus, current: HealthStatus) -> AlertSeverity {
        match current {
            HealthStatus::Unhealthy => AlertSeverity::Critical,
            HealthStatus::Degraded => AlertSeverity::Warning,
            HealthStatus::Healthy if previous != HealthStatus::Healthy => AlertSeverity::Info,
            _ => AlertSeverity::Info,
        }
    }
}

/// Overall system status, derived from the worst plugin status observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// A point-in-time sample of process-wide resource usage, taken on its own
/// 30s loop independent of plugin probing.
#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub status: SystemStatus,
    pub heap_bytes: u64,
    pub task_count: u64,
    pub core_count: usize,
    pub sampled_at_millis: u64,
}

type AlertSubscriber = Arc<dyn Fn(&HealthAlert) + Send + Sync>;

struct PluginRecord {
    plugin: Arc<dyn Probeable>,
    last_status: HealthStatus,
}

struct Inner {
    plugins: RwLock<HashMap<String, PluginRecord>>,
    in_progress: RwLock<std::collections::HashSet<String>>,
    subscribers: RwLock<Vec<AlertSubscriber>>,
    latest_system: RwLock<Option<SystemHealth>>,
    probe_interval: Duration,
    probe_timeout: Duration,
    system_interval: Duration,
    probe_task: RwLock<Option<JoinHandle<()>>>,
    system_task: RwLock<Option<JoinHandle<()>>>,
    probe_generation: AtomicU64,
}

/// Monitors the health of every registered export plugin plus the process
/// as a whole. Owned by the export Manager; never outlives it.
#[derive(Clone)]
pub struct PluginHealthMonitor {
    inner: Arc<Inner>,
}

impl PluginHealthMonitor {
    pub fn new(probe_interval: Duration, probe_timeout: Duration, system_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                plugins: RwLock::new(HashMap::new()),
                in_progress: RwLock::new(std::collections::HashSet::new()),
                subscribers: RwLock::new(Vec::new()),
                latest_system: RwLock::new(None),
                probe_interval,
                probe_timeout,
                system_interval,
                probe_task: RwLock::new(None),
                system_task: RwLock::new(None),
                probe_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            Duration::from_secs(30),
            Duration::from_secs(5),
            Duration::from_secs(30),
        )
    }

    /// Register a plugin to probe. Happens-before its first probe (the
    /// probe loop only ever sees plugins present at the start of a tick).
    pub async fn register(&self, plugin: Arc<dyn Probeable>) {
        let name = plugin.plugin_name().to_string();
        self.inner.plugins.write().await.insert(
            name,
            PluginRecord {
                plugin,
                last_status: HealthStatus::Unknown,
            },
        );
    }

    pub async fn unregister(&self, name: &str) {
        self.inner.plugins.write().await.remove(name);
    }

    /// Subscribe to alerts. Dispatch is fire-and-forget per subscriber: a
    /// panicking or slow callback never blocks the probe loop or other
    /// subscribers.
    pub async fn subscribe(&self, callback: impl Fn(&HealthAlert) + Send + Sync + 'static) {
        self.inner.subscribers.write().await.push(Arc::new(callback));
    }

    pub async fn status_of(&self, name: &str) -> Option<HealthStatus> {
        self.inner
            .plugins
            .read()
            .await
            .get(name)
            .map(|r| r.last_status)
    }

    pub async fn all_statuses(&self) -> Vec<(String, HealthStatus)> {
        self.inner
            .plugins
            .read()
            .await
            .iter()
            .map(|(name, record)| (name.clone(), record.last_status))
            .collect()
    }

    pub async fn system_health(&self) -> Option<SystemHealth> {
        self.inner.latest_system.read().await.clone()
    }

    /// Derive [`SystemStatus`] from the worst plugin status currently known.
    pub async fn system_status(&self) -> SystemStatus {
        let statuses = self.all_statuses().await;
        if statuses
            .iter()
            .any(|(_, s)| *s == HealthStatus::Unhealthy)
        {
            SystemStatus::Unhealthy
        } else if statuses.iter().any(|(_, s)| *s == HealthStatus::Degraded) {
            SystemStatus::Degraded
        } else {
            SystemStatus::Healthy
        }
    }

    /// Start both background loops: per-plugin probing and system sampling.
    pub async fn start(&self) {
        self.start_probe_loop().await;
        self.start_system_loop().await;
    }

    pub async fn stop(&self) {
        if let Some(task) = self.inner.probe_task.write().await.take() {
            task.abort();
        }
        if let Some(task) = self.inner.system_task.write().await.take() {
            task.abort();
        }
    }

    async fn start_probe_loop(&self) {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.probe_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                probe_once(&inner).await;
            }
        });
        *self.inner.probe_task.write().await = Some(task);
    }

    async fn start_system_loop(&self) {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.system_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                sample_system(&inner).await;
            }
        });
        *self.inner.system_task.write().await = Some(task);
    }

    /// Probe every plugin immediately, outside the regular interval. Used
    /// by tests and by an operator-triggered "check now" call.
    pub async fn probe_now(&self) {
        probe_once(&self.inner).await;
    }

    pub async fn sample_system_now(&self) {
        sample_system(&self.inner).await;
    }
}

async fn probe_once(inner: &Arc<Inner>) {
    inner.probe_generation.fetch_add(1, Ordering::Relaxed);
    let snapshot: Vec<(String, Arc<dyn Probeable>)> = {
        let plugins = inner.plugins.read().await;
        plugins
            .iter()
            .map(|(name, r)| (name.clone(), Arc::clone(&r.plugin)))
            .collect()
    };

    let mut handles = Vec::with_capacity(snapshot.len());
    for (name, plugin) in snapshot {
        // At-most-one outstanding probe per plugin.
        {
            let mut in_progress = inner.in_progress.write().await;
            if in_progress.contains(&name) {
                continue;
            }
            in_progress.insert(name.clone());
        }
        let inner = Arc::clone(inner);
        let timeout = inner.probe_timeout;
        handles.push(tokio::spawn(async move {
            let status = match tokio::time::timeout(timeout, plugin.health_check()).await {
                Ok(status) => status,
                Err(_) => HealthStatus::Unhealthy,
            };
            apply_status(&inner, &name, status).await;
            inner.in_progress.write().await.remove(&name);
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }
}

async fn apply_status(inner: &Arc<Inner>, name: &str, status: HealthStatus) {
    let previous = {
        let mut plugins = inner.plugins.write().await;
        match plugins.get_mut(name) {
            Some(record) => {
                let previous = record.last_status;
                record.last_status = status;
                previous
            }
            None => return,
        }
    };

    if previous == status {
        return;
    }

    let alert = HealthAlert {
        plugin_name: name.to_string(),
        previous,
        current: status,
        severity: HealthAlert::severity_for(previous, status),
        timestamp_millis: now_millis(),
    };

    let subscribers = inner.subscribers.read().await.clone();
    for subscriber in subscribers {
        let alert = alert.clone();
        // Fire-and-forget: a slow or panicking subscriber must not stall
        // the next probe tick or other subscribers.
        tokio::spawn(async move {
            subscriber(&alert);
        });
    }
}

async fn sample_system(inner: &Arc<Inner>) {
    let core_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    // Process-wide heap/task sampling has no portable stdlib API; this
    // reports the metrics that are actually available without pulling in a
    // platform-specific allocator-introspection crate.
    let task_count = tokio::runtime::Handle::try_current()
        .map(|_| 0u64)
        .unwrap_or(0);
    let status = {
        let plugins = inner.plugins.read().await;
        if plugins.values().any(|r| r.last_status == HealthStatus::Unhealthy) {
            SystemStatus::Unhealthy
        } else if plugins
            .values()
            .any(|r| r.last_status == HealthStatus::Degraded)
        {
            SystemStatus::Degraded
        } else {
            SystemStatus::Healthy
        }
    };

    let sample = SystemHealth {
        status,
        heap_bytes: 0,
        task_count,
        core_count,
        sampled_at_millis: now_millis(),
    };

    *inner.latest_system.write().await = Some(sample);
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct FlakyPlugin {
        name: String,
        status: std::sync::Mutex<HealthStatus>,
    }

    impl Probeable for FlakyPlugin {
        fn plugin_name(&self) -> &str {
            &self.name
        }

        fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
            let status = *self.status.lock().unwrap();
            Box::pin(async move { status })
        }
    }

    #[tokio::test]
    async fn probe_updates_status_and_fires_alert_on_transition() {
        let monitor = PluginHealthMonitor::with_defaults();
        let plugin = Arc::new(FlakyPlugin {
            name: "file".into(),
            status: std::sync::Mutex::new(HealthStatus::Healthy),
        });
        monitor.register(plugin.clone()).await;

        let alert_count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&alert_count);
        monitor
            .subscribe(move |alert| {
                assert_eq!(alert.plugin_name, "file");
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        monitor.probe_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(alert_count.load(Ordering::SeqCst), 1); // Unknown -> Healthy

        *plugin.status.lock().unwrap() = HealthStatus::Unhealthy;
        monitor.probe_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(alert_count.load(Ordering::SeqCst), 2);

        assert_eq!(
            monitor.status_of("file").await,
            Some(HealthStatus::Unhealthy)
        );
    }

    #[tokio::test]
    async fn system_status_reflects_worst_plugin() {
        let monitor = PluginHealthMonitor::with_defaults();
        let healthy = Arc::new(FlakyPlugin {
            name: "a".into(),
            status: std::sync::Mutex::new(HealthStatus::Healthy),
        });
        let degraded = Arc::new(FlakyPlugin {
            name: "b".into(),
            status: std::sync::Mutex::new(HealthStatus::Degraded),
        });
        monitor.register(healthy).await;
        monitor.register(degraded).await;
        monitor.probe_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(monitor.system_status().await, SystemStatus::Degraded);
    }

    #[tokio::test]
    async fn no_alert_without_status_change() {
        let monitor = PluginHealthMonitor::with_defaults();
        let plugin = Arc::new(FlakyPlugin {
            name: "stable".into(),
            status: std::sync::Mutex::new(HealthStatus::Healthy),
        });
        monitor.register(plugin).await;

        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        monitor.subscribe(move |_| { c.fetch_add(1, Ordering::SeqCst); }).await;

        monitor.probe_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        monitor.probe_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
