//! The collector framework: the enhanced-collector contract, a
//! per-resource-type registry, and a bounded parallel fan-out driver that
//! turns a collector's configuration into a [`driftwatch_model::Snapshot`].
//!
//! Grounded in `driftwatch-bulkhead`'s semaphore-bounded concurrency shape
//! and `driftwatch-executor`'s executor-abstraction idea, generalized here
//! to partition tasks rather than `tower::Service` calls, since collection
//! partitions aren't a request/response call shape.

pub mod collector;
pub mod config;
pub mod error;
pub mod fanout;
pub mod partition;
pub mod registry;

use std::sync::Arc;

use driftwatch_core::CancellationToken;
use driftwatch_model::Snapshot;

pub use collector::{Collector, CollectorStatus};
pub use config::{CollectorConfig, CollectorConfigBuilder, DEFAULT_CLUSTER_PARALLELISM};
pub use error::CollectorError;
pub use partition::{PartitionAxis, PartitionResult, PartitionScope};
pub use registry::{FetchFn, NormalizeFn, RawResource, ResourceTypeEntry, ResourceTypeRegistry};

/// A registry-driven [`Collector`] that needs no provider-specific code of
/// its own: every resource type it knows how to collect comes from entries
/// registered on its [`ResourceTypeRegistry`]. Concrete provider wiring
/// (out of scope for this crate) registers entries and hands the result to
/// the CLI surface.
pub struct RegistryCollector {
    name: String,
    provider: String,
    collector_version: String,
    registry: Arc<ResourceTypeRegistry>,
    regions: Vec<String>,
}

impl RegistryCollector {
    pub fn new(
        name: impl Into<String>,
        provider: impl Into<String>,
        collector_version: impl Into<String>,
        registry: ResourceTypeRegistry,
    ) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            collector_version: collector_version.into(),
            registry: Arc::new(registry),
            regions: Vec::new(),
        }
    }

    pub fn with_regions(mut self, regions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    /// Runs a collection directly, without going through the `Collector`
    /// trait object. Used by both `Collector::collect` and by callers that
    /// already know the concrete type.
    pub async fn run(
        &self,
        config: CollectorConfig,
        cancel: CancellationToken,
    ) -> Result<Snapshot, CollectorError> {
        if self.registry.is_empty() {
            return Err(CollectorError::UnknownResourceType(
                "<registry is empty>".to_string(),
            ));
        }

        let partitions = fanout::build_partitions(&config, &self.registry);
        let (results, timed_out) = fanout::run_partitions(
            partitions,
            Arc::clone(&self.registry),
            config.max_parallelism,
            config.deadline,
            cancel,
        )
        .await;

        Ok(fanout::fold_into_snapshot(
            &self.provider,
            &self.collector_version,
            &config,
            results,
            timed_out,
        ))
    }
}

impl Collector for RegistryCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> CollectorStatus {
        CollectorStatus::Idle
    }

    fn validate(&self, config: &CollectorConfig) -> Result<(), CollectorError> {
        for requested in &config.regions {
            if !self.regions.is_empty() && !self.regions.contains(requested) {
                return Err(CollectorError::InvalidConfig {
                    collector: self.name.clone(),
                    message: format!("region {requested} is not supported by this collector"),
                });
            }
        }
        for resource_type in &config.resource_types {
            if self.registry.get(resource_type).is_none() {
                return Err(CollectorError::UnknownResourceType(resource_type.clone()));
            }
        }
        Ok(())
    }

    fn auto_discover(&self) -> futures::future::BoxFuture<'_, Result<CollectorConfig, CollectorError>> {
        Box::pin(async move {
            Ok(CollectorConfig::builder()
                .regions(self.regions.clone())
                .resource_types(self.registry.resource_types().map(String::from))
                .build())
        })
    }

    fn supported_regions(&self) -> Vec<String> {
        self.regions.clone()
    }

    fn collect(
        &self,
        config: CollectorConfig,
        cancel: CancellationToken,
    ) -> futures::future::BoxFuture<'_, Result<Snapshot, CollectorError>> {
        Box::pin(async move { self.run(config, cancel).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch_model::{ConfigValue, Resource, ResourceMetadata};
    use std::time::Duration;

    fn registry_with(resource_type: &str, resources: Vec<&'static str>) -> ResourceTypeRegistry {
        let mut registry = ResourceTypeRegistry::new();
        let resource_type_owned = resource_type.to_string();
        registry.register(
            resource_type,
            Arc::new(move |scope| {
                let ids = resources.clone();
                Box::pin(async move {
                    Ok(ids
                        .into_iter()
                        .map(|id| RawResource(ConfigValue::String(format!("{id}@{scope}"))))
                        .collect())
                })
            }),
            Arc::new(move |raw| {
                let id = match raw.0 {
                    ConfigValue::String(s) => s,
                    _ => "unknown".to_string(),
                };
                Resource {
                    id: id.clone(),
                    resource_type: resource_type_owned.clone(),
                    name: id,
                    provider: "test".into(),
                    namespace: None,
                    region: None,
                    configuration: Default::default(),
                    tags: Default::default(),
                    metadata: ResourceMetadata {
                        created_at: None,
                        version: Some("v1".into()),
                        collection_duration_ms: Some(1),
                        provider_data: Default::default(),
                    },
                }
            }),
        );
        registry
    }

    #[tokio::test]
    async fn collects_across_namespaces_and_merges_resources() {
        let registry = registry_with("pod", vec!["a", "b"]);
        let collector = RegistryCollector::new("k8s-test", "kubernetes", "0.1.0", registry);
        let config = CollectorConfig::builder()
            .namespaces(["ns1", "ns2"])
            .resource_types(["pod"])
            .build();

        let snapshot = collector
            .run(config, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(snapshot.resources.len(), 4);
        assert!(!snapshot.metadata.partial);
        assert!(snapshot.metadata.errors.is_empty());
    }

    #[tokio::test]
    async fn cluster_wide_resource_type_is_collected_once_regardless_of_namespaces() {
        let mut registry = registry_with("persistent_volume", vec!["pv-1"]);
        let pod_registry = registry_with("pod", vec!["a"]);
        for t in pod_registry.resource_types() {
            let entry = pod_registry.get(t).unwrap().clone();
            registry.register(t.to_string(), entry.fetch, entry.normalize);
        }

        let collector = RegistryCollector::new("k8s-test", "kubernetes", "0.1.0", registry);
        let config = CollectorConfig::builder()
            .namespaces(["ns1", "ns2", "ns3"])
            .resource_types(["pod", "persistent_volume"])
            .cluster_wide_resource_types(["persistent_volume"])
            .build();

        let snapshot = collector
            .run(config, CancellationToken::new())
            .await
            .unwrap();

        let pv_count = snapshot
            .resources
            .iter()
            .filter(|r| r.resource_type == "persistent_volume")
            .count();
        let pod_count = snapshot
            .resources
            .iter()
            .filter(|r| r.resource_type == "pod")
            .count();
        assert_eq!(pv_count, 1, "persistent volumes must be collected exactly once");
        assert_eq!(pod_count, 3, "pods fan out across all 3 namespaces");
    }

    #[tokio::test]
    async fn partition_failure_is_accumulated_not_fatal() {
        let mut registry = ResourceTypeRegistry::new();
        registry.register(
            "broken",
            Arc::new(|scope| {
                Box::pin(async move {
                    Err(CollectorError::ProviderRequest {
                        resource_type: scope.resource_type.clone(),
                        scope: scope.to_string(),
                        message: "simulated provider outage".into(),
                    })
                })
            }),
            Arc::new(|_raw| unreachable!("normalize never runs on a failed fetch")),
        );

        let collector = RegistryCollector::new("flaky", "aws", "0.1.0", registry);
        let config = CollectorConfig::builder()
            .regions(["us-east-1"])
            .resource_types(["broken"])
            .build();

        let snapshot = collector
            .run(config, CancellationToken::new())
            .await
            .unwrap();

        assert!(snapshot.resources.is_empty());
        assert!(snapshot.metadata.partial);
        assert_eq!(snapshot.metadata.errors.len(), 1);
        assert!(snapshot.metadata.errors[0].contains("simulated provider outage"));
    }

    #[tokio::test]
    async fn cancellation_yields_partial_snapshot_promptly() {
        let mut registry = ResourceTypeRegistry::new();
        registry.register(
            "slow",
            Arc::new(|_scope| {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(Vec::new())
                })
            }),
            Arc::new(|_raw| unreachable!()),
        );

        let collector = RegistryCollector::new("slow-collector", "aws", "0.1.0", registry);
        let config = CollectorConfig::builder()
            .regions(["us-east-1"])
            .resource_types(["slow"])
            .deadline(Duration::from_secs(60))
            .build();

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel_clone.cancel();
        });

        let started = std::time::Instant::now();
        let snapshot = tokio::time::timeout(Duration::from_millis(500), collector.run(config, cancel))
            .await
            .expect("cancellation must make collect() return promptly")
            .unwrap();

        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(snapshot.resources.is_empty());
    }

    #[tokio::test]
    async fn validate_rejects_unsupported_region() {
        let registry = registry_with("pod", vec!["a"]);
        let collector = RegistryCollector::new("k8s", "kubernetes", "0.1.0", registry)
            .with_regions(["us-east-1"]);
        let config = CollectorConfig::builder().regions(["eu-west-1"]).build();
        assert!(matches!(
            collector.validate(&config),
            Err(CollectorError::InvalidConfig { .. })
        ));
    }
}
