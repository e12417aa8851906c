//! The bounded parallel fan-out driver: turns a [`CollectorConfig`] plus a
//! [`ResourceTypeRegistry`] into partitions, runs them under a semaphore and
//! an overall deadline, and folds the results into a [`Snapshot`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use driftwatch_core::CancellationToken;
use driftwatch_model::{Snapshot, SnapshotMetadata};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::CollectorConfig;
use crate::error::CollectorError;
use crate::partition::{PartitionAxis, PartitionResult, PartitionScope};
use crate::registry::ResourceTypeRegistry;

/// Builds the partition list for a collection run: one partition per
/// `(resource-type, axis)` pair, collapsing cluster-wide resource types to a
/// single partition regardless of namespace fan-out (spec.md §4.2).
pub fn build_partitions(config: &CollectorConfig, registry: &ResourceTypeRegistry) -> Vec<PartitionScope> {
    let types: Vec<String> = if config.resource_types.is_empty() {
        registry.resource_types().map(String::from).collect()
    } else {
        config.resource_types.clone()
    };

    let mut partitions = Vec::new();
    for resource_type in types {
        if config
            .cluster_wide_resource_types
            .iter()
            .any(|t| t == &resource_type)
        {
            partitions.push(PartitionScope {
                resource_type,
                axis: PartitionAxis::ClusterWide,
            });
            continue;
        }

        if !config.namespaces.is_empty() {
            for ns in &config.namespaces {
                partitions.push(PartitionScope {
                    resource_type: resource_type.clone(),
                    axis: PartitionAxis::Namespace(ns.clone()),
                });
            }
        } else if !config.regions.is_empty() {
            for region in &config.regions {
                partitions.push(PartitionScope {
                    resource_type: resource_type.clone(),
                    axis: PartitionAxis::Region(region.clone()),
                });
            }
        } else {
            partitions.push(PartitionScope {
                resource_type,
                axis: PartitionAxis::ClusterWide,
            });
        }
    }
    partitions
}

/// Runs every partition under a bounded semaphore and an overall deadline,
/// returning one [`PartitionResult`] per partition that completed (or was
/// canceled) before the deadline. A partition that doesn't complete before
/// the deadline is dropped from the output and reflected only in the
/// caller's `partial` flag — it is not retried here.
pub async fn run_partitions(
    partitions: Vec<PartitionScope>,
    registry: Arc<ResourceTypeRegistry>,
    max_parallelism: usize,
    deadline: Duration,
    cancel: CancellationToken,
) -> (Vec<PartitionResult>, bool) {
    let semaphore = Arc::new(Semaphore::new(max_parallelism.max(1)));
    let mut joinset: JoinSet<PartitionResult> = JoinSet::new();

    for scope in partitions {
        let Some(entry) = registry.get(&scope.resource_type).cloned() else {
            continue;
        };
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();
        joinset.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("fan-out semaphore is never closed while partitions are running");
            let started = Instant::now();

            if cancel.is_cancelled() {
                return PartitionResult {
                    scope,
                    resources: Vec::new(),
                    error: Some("canceled before partition started".to_string()),
                    duration: started.elapsed(),
                };
            }

            let fetch = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(CollectorError::Canceled),
                result = (entry.fetch)(scope.clone()) => result,
            };

            match fetch {
                Ok(raw) => {
                    let resources = raw.into_iter().map(|r| (entry.normalize)(r)).collect();
                    PartitionResult {
                        scope,
                        resources,
                        error: None,
                        duration: started.elapsed(),
                    }
                }
                Err(err) => PartitionResult {
                    scope,
                    resources: Vec::new(),
                    error: Some(err.to_string()),
                    duration: started.elapsed(),
                },
            }
        });
    }

    let mut results = Vec::new();
    let deadline_fut = tokio::time::sleep(deadline);
    tokio::pin!(deadline_fut);

    loop {
        tokio::select! {
            biased;
            _ = &mut deadline_fut => {
                joinset.abort_all();
                return (results, true);
            }
            joined = joinset.join_next() => {
                match joined {
                    Some(Ok(result)) => results.push(result),
                    Some(Err(_join_err)) => {
                        // A task panicked or was aborted; treated as partial,
                        // not fatal to the overall collection.
                    }
                    None => return (results, cancel.is_cancelled()),
                }
            }
        }
    }
}

/// Folds partition results into a [`Snapshot`], per spec.md §4.2: partition
/// errors are accumulated in `metadata.errors`, never fatal.
pub fn fold_into_snapshot(
    provider: &str,
    collector_version: &str,
    config: &CollectorConfig,
    results: Vec<PartitionResult>,
    timed_out: bool,
) -> Snapshot {
    let mut resources = Vec::new();
    let mut errors = Vec::new();
    let mut total_duration = Duration::ZERO;

    for result in results {
        total_duration += result.duration;
        if let Some(err) = &result.error {
            errors.push(format!("{}: {}", result.scope, err));
        }
        resources.extend(result.resources);
    }

    let partial = timed_out || !errors.is_empty();
    let metadata = SnapshotMetadata {
        collector_version: collector_version.to_string(),
        collection_duration_ms: total_duration.as_millis() as u64,
        resource_count: resources.len(),
        namespaces: config.namespaces.clone(),
        regions: config.regions.clone(),
        partial,
        errors,
    };

    Snapshot::new(provider, Utc::now(), resources, metadata)
}
