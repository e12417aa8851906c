//! Hot configuration reload (spec.md §4.10): watches the canonical
//! configuration file, and on a genuine content change reconciles a running
//! [`driftwatch_export::Manager`]'s plugin set and routes to match it.
//!
//! This crate never constructs plugins. It only ever calls
//! `update_config`/`unregister_plugin` against plugins the caller already
//! registered — reload augments a manager's lifecycle, it doesn't replace
//! `register_plugin` as the way a plugin joins the system.

pub mod document;
pub mod error;
pub mod events;
pub mod reconcile;
pub mod watcher;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use driftwatch_core::events::{EventListener, EventListeners};
use driftwatch_core::CancellationToken;
use driftwatch_executor::Executor;
use driftwatch_export::Manager;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

pub use document::CanonicalConfig;
pub use error::ReloadError;
pub use events::ReloadEvent;
pub use reconcile::ReloadOutcome;
pub use watcher::FileWatcher;

/// Watches one configuration file and reconciles one manager against it.
///
/// Lock note (spec.md §5): `listeners` is this component's own lock; the
/// reload cycle it guards calls into the manager, which in turn may acquire
/// its own `plugins` lock, but `Reloader` never holds `listeners` across
/// that call — `check_once` reads, reconciles, then locks `listeners` only
/// to emit the resulting event.
pub struct Reloader<E: Executor> {
    watcher: FileWatcher,
    manager: Arc<Manager<E>>,
    check_interval: Duration,
    reload_count: AtomicU64,
    listeners: RwLock<EventListeners<ReloadEvent>>,
    shutdown: CancellationToken,
}

impl<E: Executor> Reloader<E> {
    pub fn new(config_path: impl Into<PathBuf>, manager: Arc<Manager<E>>) -> Self {
        Self::with_interval(config_path, manager, Duration::from_secs(30))
    }

    pub fn with_interval(
        config_path: impl Into<PathBuf>,
        manager: Arc<Manager<E>>,
        check_interval: Duration,
    ) -> Self {
        Self {
            watcher: FileWatcher::new(config_path),
            manager,
            check_interval,
            reload_count: AtomicU64::new(0),
            listeners: RwLock::new(EventListeners::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub async fn subscribe<L>(&self, listener: L)
    where
        L: EventListener<ReloadEvent> + 'static,
    {
        self.listeners.write().await.add(listener);
    }

    pub fn reload_count(&self) -> u64 {
        self.reload_count.load(Ordering::SeqCst)
    }

    /// One check-and-maybe-reload cycle. `Ok(None)` means the file's content
    /// hasn't changed since the last applied reload. Exposed directly so
    /// callers and tests can drive a reload deterministically instead of
    /// waiting on [`Reloader::spawn`]'s tick.
    pub async fn check_once(&self) -> Result<Option<ReloadOutcome>, ReloadError> {
        let path_display = self.watcher.path().display().to_string();

        let bytes = match self.watcher.poll().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(source) => {
                let err = ReloadError::Read {
                    path: path_display,
                    source,
                };
                self.emit_failure(&err).await;
                return Err(err);
            }
        };

        let config = match CanonicalConfig::parse(&bytes) {
            Ok(config) => config,
            Err(source) => {
                let err = ReloadError::Parse {
                    path: path_display,
                    source,
                };
                self.emit_failure(&err).await;
                return Err(err);
            }
        };

        let outcome = match reconcile::reconcile(&self.manager, &config).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.emit_failure(&err).await;
                return Err(err);
            }
        };

        let reload_count = self.reload_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.listeners.read().await.emit(&ReloadEvent::Applied {
            reload_count,
            outcome: outcome.clone(),
            timestamp: Instant::now(),
        });

        Ok(Some(outcome))
    }

    async fn emit_failure(&self, err: &ReloadError) {
        tracing::warn!(error = %err, "configuration reload failed; previous configuration remains active");
        self.listeners.read().await.emit(&ReloadEvent::Failed {
            reason: err.to_string(),
            timestamp: Instant::now(),
        });
    }

    /// Spawns the periodic watch loop. A failed cycle is logged and never
    /// aborts the loop itself — only that one reload.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.check_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let _ = self.check_once().await;
            }
        })
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}
