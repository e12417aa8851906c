//! Periodic pull of each plugin's self-reported extra metrics, run
//! alongside (not instead of) the counters [`crate::recorder::MetricsRecorder`]
//! tracks from `record_success`/`record_error`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use driftwatch_model::ConfigValue;
use futures::future::{join_all, BoxFuture};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Anything `driftwatch-metrics` can pull plugin-reported metrics from.
/// `driftwatch-export`'s `ExportPlugin` is the only real implementor; kept
/// as its own trait so this crate never depends on the export runtime.
pub trait MetricsSource: Send + Sync {
    fn plugin_name(&self) -> &str;
    fn get_metrics(&self) -> BoxFuture<'_, BTreeMap<String, ConfigValue>>;
}

struct Inner {
    sources: RwLock<HashMap<String, Arc<dyn MetricsSource>>>,
    cache: RwLock<HashMap<String, BTreeMap<String, ConfigValue>>>,
    interval: Duration,
    task: RwLock<Option<JoinHandle<()>>>,
}

/// Drives the spec.md §4.9 "pull `plugin.get_metrics()` for each plugin in
/// parallel and cache" loop, default every 60 s.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Inner>,
}

impl MetricsCollector {
    pub fn new(interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                sources: RwLock::new(HashMap::new()),
                cache: RwLock::new(HashMap::new()),
                interval,
                task: RwLock::new(None),
            }),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Duration::from_secs(60))
    }

    pub async fn register(&self, source: Arc<dyn MetricsSource>) {
        let name = source.plugin_name().to_string();
        self.inner.sources.write().await.insert(name, source);
    }

    pub async fn unregister(&self, plugin_name: &str) {
        self.inner.sources.write().await.remove(plugin_name);
        self.inner.cache.write().await.remove(plugin_name);
    }

    pub async fn cached(&self, plugin_name: &str) -> Option<BTreeMap<String, ConfigValue>> {
        self.inner.cache.read().await.get(plugin_name).cloned()
    }

    pub async fn start(&self) {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                collect_once(&inner).await;
            }
        });
        *self.inner.task.write().await = Some(task);
    }

    pub async fn stop(&self) {
        if let Some(task) = self.inner.task.write().await.take() {
            task.abort();
        }
    }

    pub async fn collect_now(&self) {
        collect_once(&self.inner).await;
    }
}

async fn collect_once(inner: &Arc<Inner>) {
    let snapshot: Vec<(String, Arc<dyn MetricsSource>)> = {
        let sources = inner.sources.read().await;
        sources
            .iter()
            .map(|(name, source)| (name.clone(), Arc::clone(source)))
            .collect()
    };

    let pulls = snapshot
        .iter()
        .map(|(name, source)| {
            let name = name.clone();
            let source = Arc::clone(source);
            async move { (name, source.get_metrics().await) }
        })
        .collect::<Vec<_>>();

    let results = join_all(pulls).await;
    tracing::debug!(plugins = results.len(), "collected plugin-reported metrics");
    let mut cache = inner.cache.write().await;
    for (name, metrics) in results {
        cache.insert(name, metrics);
    }
}
