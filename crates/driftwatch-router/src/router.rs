//! The [`Router`]: registers compiled routes, matches requests against them
//! in priority order, applies the configured load-balancing strategy among
//! ties, and updates match statistics.

use std::sync::RwLock;

use chrono::Utc;
use driftwatch_model::{ExportRequest, Route};

use crate::breaker::{self, SharedBreakerProbe};
use crate::error::RouterError;
use crate::pattern::CompiledPattern;
use crate::strategy::LoadBalanceStrategy;

pub struct CompiledRoute {
    pub route: Route,
    pattern: CompiledPattern,
}

/// Owns the route table behind a single `RwLock`, per spec.md §5's
/// per-component lock discipline. The router never acquires another
/// component's lock while holding this one; it is the last lock in the
/// documented hierarchy (manager -> queue -> workers -> health -> metrics
/// -> router), so it never needs to worry about ordering against anything
/// else.
pub struct Router {
    routes: RwLock<Vec<CompiledRoute>>,
    default_plugin: Option<String>,
    strategy: LoadBalanceStrategy,
    breaker_probe: SharedBreakerProbe,
}

pub struct RouterBuilder {
    default_plugin: Option<String>,
    strategy: LoadBalanceStrategy,
    breaker_probe: SharedBreakerProbe,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self {
            default_plugin: None,
            strategy: LoadBalanceStrategy::default(),
            breaker_probe: breaker::default_probe(),
        }
    }
}

impl RouterBuilder {
    pub fn default_plugin(mut self, name: impl Into<String>) -> Self {
        self.default_plugin = Some(name.into());
        self
    }

    pub fn strategy(mut self, strategy: LoadBalanceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn breaker_probe(mut self, probe: SharedBreakerProbe) -> Self {
        self.breaker_probe = probe;
        self
    }

    pub fn build(self) -> Router {
        Router {
            routes: RwLock::new(Vec::new()),
            default_plugin: self.default_plugin,
            strategy: self.strategy,
            breaker_probe: self.breaker_probe,
        }
    }
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Compiles and registers a route. Conditions are compiled once here,
    /// not re-parsed on every match.
    pub fn register(&self, route: Route) -> Result<(), RouterError> {
        let pattern = CompiledPattern::compile(route.pattern.clone())?;
        let mut routes = self.routes.write().unwrap();
        routes.push(CompiledRoute { route, pattern });
        routes.sort_by(|a, b| b.route.priority.cmp(&a.route.priority));
        Ok(())
    }

    /// Removes the first route whose pattern is structurally equal to
    /// `pattern` (spec.md §4.7: "all fields plus conditions pointwise").
    pub fn unregister_by_pattern(&self, pattern: &driftwatch_model::RoutePattern) -> bool {
        let mut routes = self.routes.write().unwrap();
        if let Some(pos) = routes.iter().position(|r| &r.route.pattern == pattern) {
            routes.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.read().unwrap().iter().map(|r| r.route.clone()).collect()
    }

    /// Selects a plugin name for `request`, following spec.md §4.7's
    /// routing algorithm: priority order, skip disabled/breaker-open
    /// routes, first match unless load balancing, else apply the
    /// configured strategy across all matches; fall back to the default
    /// plugin; otherwise `NoRoute`.
    pub fn select(&self, request: &ExportRequest) -> Result<String, RouterError> {
        let mut routes = self.routes.write().unwrap();

        let candidate_indices: Vec<usize> = routes
            .iter()
            .enumerate()
            .filter(|(_, r)| r.route.enabled)
            .filter(|(_, r)| !self.breaker_probe.is_open(&r.route.plugin_name))
            .filter(|(_, r)| r.pattern.matches(request))
            .map(|(i, _)| i)
            .collect();

        let chosen = if matches!(self.strategy, LoadBalanceStrategy::FirstMatch) {
            candidate_indices.first().copied()
        } else {
            self.strategy.select(&routes, &candidate_indices)
        };

        match chosen {
            Some(index) => {
                routes[index].route.match_count += 1;
                routes[index].route.last_matched = Some(Utc::now());
                Ok(routes[index].route.plugin_name.clone())
            }
            None => self.default_plugin.clone().ok_or(RouterError::NoRoute),
        }
    }
}
