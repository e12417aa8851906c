//! The export plugin contract.
//!
//! Grounded in the pack's `ultrafast-ai-gateway` plugin registry shape (a
//! trait object registry keyed by name, `Arc<dyn Plugin>`), adapted to the
//! lifecycle this crate's manager drives: `initialize` once at registration,
//! `start`/`stop` as the manager's own run state changes, `export` per
//! request, plus the health/metrics/config seams the manager wires into
//! `driftwatch-health` and `driftwatch-metrics`.

use std::collections::BTreeMap;
use std::sync::Arc;

use driftwatch_health::HealthStatus;
use driftwatch_model::{ConfigValue, ExportRequest, ExportResponse};
use futures::future::BoxFuture;

use crate::context::ExportContext;
use crate::error::ExportError;

pub trait ExportPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn supported_formats(&self) -> Vec<String>;

    fn initialize(&self, ctx: &ExportContext) -> BoxFuture<'_, Result<(), ExportError>>;

    fn validate(&self) -> BoxFuture<'_, Result<(), ExportError>>;

    fn start(&self) -> BoxFuture<'_, Result<(), ExportError>>;

    fn stop(&self) -> BoxFuture<'_, Result<(), ExportError>>;

    fn export(
        &self,
        ctx: &ExportContext,
        request: ExportRequest,
    ) -> BoxFuture<'_, Result<ExportResponse, ExportError>>;

    fn health_check(&self) -> BoxFuture<'_, HealthStatus>;

    /// Plugin-self-reported extra metrics, pulled periodically by
    /// `driftwatch-metrics`'s collector. Most plugins return an empty map.
    fn get_metrics(&self) -> BoxFuture<'_, BTreeMap<String, ConfigValue>> {
        Box::pin(async { BTreeMap::new() })
    }

    fn update_config(&self, settings: ConfigValue) -> BoxFuture<'_, Result<(), ExportError>>;
}

/// Bridges an [`ExportPlugin`] to [`driftwatch_health::Probeable`] so the
/// manager can register plugins with the health monitor without that crate
/// depending on this one.
pub struct ProbeableAdapter(pub Arc<dyn ExportPlugin>);

impl driftwatch_health::Probeable for ProbeableAdapter {
    fn plugin_name(&self) -> &str {
        self.0.name()
    }

    fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
        self.0.health_check()
    }
}

/// Bridges an [`ExportPlugin`] to [`driftwatch_metrics::MetricsSource`].
pub struct MetricsSourceAdapter(pub Arc<dyn ExportPlugin>);

impl driftwatch_metrics::MetricsSource for MetricsSourceAdapter {
    fn plugin_name(&self) -> &str {
        self.0.name()
    }

    fn get_metrics(&self) -> BoxFuture<'_, BTreeMap<String, ConfigValue>> {
        self.0.get_metrics()
    }
}
