//! Builder-style configuration for a collection run, following the same
//! shape as `driftwatch-connection`'s `ConnectionConfigBuilder`.

use std::time::Duration;

/// Default bound for cloud-style fan-out: `min(#CPU, 8)` per spec.md §4.2.
pub fn default_cloud_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(8)
}

/// Kubernetes-style collectors default to a flat 6 regardless of CPU count
/// (spec.md §4.2: "Kubernetes default 6").
pub const DEFAULT_CLUSTER_PARALLELISM: usize = 6;

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Regions to fan out over (cloud collectors). Empty means "whatever
    /// `auto_discover` returns".
    pub regions: Vec<String>,
    /// Namespaces to fan out over (cluster collectors).
    pub namespaces: Vec<String>,
    /// Resource types to collect; empty means "every type the registry
    /// knows about".
    pub resource_types: Vec<String>,
    /// Cluster-wide resource types (collected once, not fanned out over
    /// namespaces) even when present in `resource_types`.
    pub cluster_wide_resource_types: Vec<String>,
    pub max_parallelism: usize,
    pub deadline: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            namespaces: Vec::new(),
            resource_types: Vec::new(),
            cluster_wide_resource_types: Vec::new(),
            max_parallelism: default_cloud_parallelism(),
            deadline: Duration::from_secs(120),
        }
    }
}

impl CollectorConfig {
    pub fn builder() -> CollectorConfigBuilder {
        CollectorConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectorConfigBuilder {
    config: CollectorConfig,
}

impl CollectorConfigBuilder {
    pub fn regions(mut self, regions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn namespaces(mut self, namespaces: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn resource_types(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.resource_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn cluster_wide_resource_types(
        mut self,
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.config.cluster_wide_resource_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_parallelism(mut self, n: usize) -> Self {
        self.config.max_parallelism = n.max(1);
        self
    }

    pub fn cluster_defaults(mut self) -> Self {
        self.config.max_parallelism = DEFAULT_CLUSTER_PARALLELISM;
        self
    }

    pub fn deadline(mut self, d: Duration) -> Self {
        self.config.deadline = d;
        self
    }

    pub fn build(self) -> CollectorConfig {
        self.config
    }
}
