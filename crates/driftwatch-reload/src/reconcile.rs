//! Reconciles a parsed [`CanonicalConfig`] against a running
//! [`driftwatch_export::Manager`] (spec.md §4.10):
//!
//! 1. every enabled plugin named in the new config that already exists gets
//!    `update_config`'d;
//! 2. every enabled plugin named in the new config that does *not* exist is
//!    logged and skipped — dynamic instantiation from configuration is
//!    unsupported, since the manager only ever owns plugin instances handed
//!    to it programmatically via `register_plugin`;
//! 3. every running plugin not present (or no longer enabled) in the new
//!    config is stopped and unregistered;
//! 4. the router is rebuilt: every remaining plugin's default per-format
//!    routes, then the file's explicit route entries, highest priority
//!    first via [`driftwatch_router::Router::register`]'s own sort.

use std::collections::{HashMap, HashSet};

use driftwatch_executor::Executor;
use driftwatch_export::Manager;
use driftwatch_model::{Route, RoutePattern};

use crate::document::CanonicalConfig;
use crate::error::ReloadError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadOutcome {
    pub plugins_updated: Vec<String>,
    pub plugins_unregistered: Vec<String>,
    pub plugins_unsupported: Vec<String>,
    pub default_routes_registered: usize,
    pub configured_routes_registered: usize,
}

pub async fn reconcile<E: Executor>(
    manager: &Manager<E>,
    config: &CanonicalConfig,
) -> Result<ReloadOutcome, ReloadError> {
    let current: HashSet<String> = manager.list_plugins().await.into_iter().collect();
    let desired: HashMap<String, &crate::document::PluginConfigEntry> =
        config.enabled_plugins().map(|p| (p.name.clone(), p)).collect();

    let mut outcome = ReloadOutcome::default();

    for (name, entry) in &desired {
        if current.contains(name) {
            manager.update_plugin_config(name, entry.settings.clone()).await?;
            outcome.plugins_updated.push(name.clone());
        } else {
            tracing::warn!(
                plugin = %name,
                "plugin named in configuration is not registered; dynamic instantiation from configuration is unsupported"
            );
            outcome.plugins_unsupported.push(name.clone());
        }
    }

    for name in &current {
        if !desired.contains_key(name) {
            manager.unregister_plugin(name).await?;
            outcome.plugins_unregistered.push(name.clone());
        }
    }

    rebuild_router(manager, config, &mut outcome).await?;

    Ok(outcome)
}

async fn rebuild_router<E: Executor>(
    manager: &Manager<E>,
    config: &CanonicalConfig,
    outcome: &mut ReloadOutcome,
) -> Result<(), ReloadError> {
    let router = manager.router();

    for route in router.routes() {
        router.unregister_by_pattern(&route.pattern);
    }

    for name in manager.list_plugins().await {
        let Some(formats) = manager.supported_formats(&name).await else {
            continue;
        };
        for format in formats {
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
            router.register(route)?;
            outcome.default_routes_registered += 1;
        }
    }

    for (index, entry) in config.routes.iter().enumerate() {
        let route = Route {
            id: format!("{}-configured-{index}", entry.plugin_name),
            pattern: entry.pattern.clone(),
            plugin_name: entry.plugin_name.clone(),
            priority: entry.priority,
            enabled: entry.enabled,
            match_count: 0,
            last_matched: None,
        };
        router.register(route)?;
        outcome.configured_routes_registered += 1;
    }

    Ok(())
}
