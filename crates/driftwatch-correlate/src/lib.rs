//! Groups a set of [`SimpleChange`]s produced by `driftwatch-differ` into
//! [`ChangeGroup`]s: human-meaningful correlations like "this deployment
//! scaled and its pods rolled" rather than a flat list of unrelated diffs.
//!
//! Grounded in the bulkhead/executor worker-pool shape used elsewhere in this
//! workspace: a fixed roster of [`PatternMatcher`]s, each dispatched onto its
//! own task behind a semaphore that bounds how many run concurrently, with a
//! per-result timeout and a deadline over the whole run.

pub mod matchers;
pub mod score;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use driftwatch_core::error::{ErrorKind, HasErrorKind};
use driftwatch_model::{ChangeGroup, Confidence, SimpleChange};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use matchers::{
    Candidate, ConfigUpdate, NetworkChanges, PatternKind, PatternMatcher, Scaling, SecurityChanges,
    ServiceDeployment, StorageChanges,
};

#[derive(Debug, thiserror::Error)]
pub enum CorrelationError {
    #[error("correlation run exceeded its overall deadline")]
    DeadlineExceeded,
}

impl HasErrorKind for CorrelationError {
    fn kind(&self) -> ErrorKind {
        match self {
            CorrelationError::DeadlineExceeded => ErrorKind::Unavailable,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorrelationConfig {
    /// General correlation window used by most pattern matchers (default
    /// 30s). `config_update` additionally applies its own fixed 2-minute
    /// dependent-resource window regardless of this value.
    pub window: Duration,
    /// Hard ceiling over the whole correlation run.
    pub overall_deadline: Duration,
    /// Per-pattern-worker timeout; a worker that exceeds this is treated as
    /// having found nothing rather than failing the whole run.
    pub per_result_timeout: Duration,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(30),
            overall_deadline: Duration::from_secs(30),
            per_result_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerStat {
    pub pattern_type: &'static str,
    pub duration: Duration,
    pub candidates_found: usize,
    pub timed_out: bool,
}

#[derive(Debug, Clone)]
pub struct CorrelationStats {
    pub total_changes: usize,
    pub grouped: usize,
    pub ungrouped: usize,
    pub by_confidence: BTreeMap<Confidence, usize>,
    pub worker_stats: Vec<WorkerStat>,
}

#[derive(Debug, Clone)]
pub struct CorrelationResult {
    pub groups: Vec<ChangeGroup>,
    pub stats: CorrelationStats,
}

/// Groups changes by `(resource_type, namespace)`. Purely informational: the
/// matchers themselves always see the full change set (see `matchers`
/// module docs for why), so this is used only to report partition counts in
/// [`CorrelationStats`]-adjacent tooling, not to restrict matcher input.
pub fn partition_changes(
    changes: &[SimpleChange],
) -> BTreeMap<(String, Option<String>), Vec<&SimpleChange>> {
    let mut out: BTreeMap<(String, Option<String>), Vec<&SimpleChange>> = BTreeMap::new();
    for c in changes {
        out.entry((c.resource_type.clone(), c.namespace.clone()))
            .or_default()
            .push(c);
    }
    out
}

fn roster(window: Duration) -> Vec<Box<dyn PatternMatcher>> {
    vec![
        Box::new(Scaling { window }),
        Box::new(ConfigUpdate),
        Box::new(ServiceDeployment { window }),
        Box::new(NetworkChanges { window }),
        Box::new(StorageChanges { window }),
        Box::new(SecurityChanges { window }),
    ]
}

/// Runs the full correlation pipeline: dispatch every pattern matcher,
/// stably sort and dedup their candidates, score the survivors, and collapse
/// whatever is left unclaimed into a single low-confidence "Other Changes"
/// group.
pub async fn correlate(
    changes: &[SimpleChange],
    config: CorrelationConfig,
) -> Result<CorrelationResult, CorrelationError> {
    let changes = Arc::new(changes.to_vec());
    let worker_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .clamp(2, 8);
    let semaphore = Arc::new(Semaphore::new(worker_count));

    let run = async {
        let mut set = JoinSet::new();
        for matcher in roster(config.window) {
            let changes = Arc::clone(&changes);
            let semaphore = Arc::clone(&semaphore);
            let timeout = config.per_result_timeout;
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let pattern_type = matcher.pattern_type().as_str();
                let start = std::time::Instant::now();
                match tokio::time::timeout(timeout, async { matcher.find(&changes) }).await {
                    Ok(candidates) => WorkerOutcome {
                        stat: WorkerStat {
                            pattern_type,
                            duration: start.elapsed(),
                            candidates_found: candidates.len(),
                            timed_out: false,
                        },
                        candidates,
                    },
                    Err(_) => WorkerOutcome {
                        stat: WorkerStat {
                            pattern_type,
                            duration: start.elapsed(),
                            candidates_found: 0,
                            timed_out: true,
                        },
                        candidates: Vec::new(),
                    },
                }
            });
        }

        let mut worker_stats = Vec::new();
        let mut all_candidates: Vec<Candidate> = Vec::new();
        while let Some(joined) = set.join_next().await {
            if let Ok(outcome) = joined {
                worker_stats.push(outcome.stat);
                all_candidates.extend(outcome.candidates);
            }
        }
        (worker_stats, all_candidates)
    };

    let (worker_stats, mut all_candidates) = tokio::time::timeout(config.overall_deadline, run)
        .await
        .map_err(|_| CorrelationError::DeadlineExceeded)?;

    // Stable dedup key: pattern priority, then timestamp, then the trigger
    // resource id, so concurrent workers racing on resource ownership always
    // resolve the same way regardless of completion order.
    all_candidates.sort_by(|a, b| {
        a.pattern
            .priority()
            .cmp(&b.pattern.priority())
            .then(a.timestamp.cmp(&b.timestamp))
            .then(a.first_resource_id().cmp(b.first_resource_id()))
    });

    let mut claimed: HashSet<String> = HashSet::new();
    let mut accepted: Vec<Candidate> = Vec::new();
    for candidate in all_candidates {
        if candidate.changes.iter().any(|c| claimed.contains(&c.resource_id)) {
            continue;
        }
        for c in &candidate.changes {
            claimed.insert(c.resource_id.clone());
        }
        accepted.push(candidate);
    }

    let groups = score_candidates(accepted).await;

    let ungrouped: Vec<SimpleChange> = changes
        .iter()
        .filter(|c| !claimed.contains(&c.resource_id))
        .cloned()
        .collect();

    let grouped = groups.iter().map(|g| g.changes.len()).sum::<usize>();
    let ungrouped_count = ungrouped.len();

    let mut all_groups = groups;
    if !ungrouped.is_empty() {
        let timestamp = ungrouped.iter().map(|c| c.timestamp).min().unwrap();
        all_groups.push(ChangeGroup {
            timestamp,
            title: "Other Changes".to_string(),
            description: format!("{} uncorrelated change(s)", ungrouped.len()),
            reason: "no pattern matched".to_string(),
            confidence: Confidence::Low,
            changes: ungrouped,
        });
    }

    let mut by_confidence: BTreeMap<Confidence, usize> = BTreeMap::new();
    for g in &all_groups {
        *by_confidence.entry(g.confidence).or_insert(0) += 1;
    }

    Ok(CorrelationResult {
        stats: CorrelationStats {
            total_changes: changes.len(),
            grouped,
            ungrouped: ungrouped_count,
            by_confidence,
            worker_stats,
        },
        groups: all_groups,
    })
}

struct WorkerOutcome {
    stat: WorkerStat,
    candidates: Vec<Candidate>,
}

/// Confidence scoring runs in parallel once there are enough accepted groups
/// to make the fan-out worthwhile; a handful of groups are scored inline.
async fn score_candidates(candidates: Vec<Candidate>) -> Vec<ChangeGroup> {
    if candidates.len() <= 10 {
        return candidates.into_iter().map(build_group).collect();
    }

    let mut set = JoinSet::new();
    for (index, candidate) in candidates.into_iter().enumerate() {
        set.spawn(async move { (index, build_group(candidate)) });
    }
    let mut results = Vec::new();
    while let Some(joined) = set.join_next().await {
        if let Ok(pair) = joined {
            results.push(pair);
        }
    }
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, g)| g).collect()
}

fn build_group(candidate: Candidate) -> ChangeGroup {
    let confidence = score::confidence_for(&candidate.changes, candidate.pattern);
    ChangeGroup {
        timestamp: candidate.timestamp,
        title: candidate.title,
        description: candidate.description,
        reason: candidate.reason,
        confidence,
        changes: candidate.changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use driftwatch_model::{ChangeType, SimpleFieldChange};

    fn change(
        change_type: ChangeType,
        id: &str,
        resource_type: &str,
        name: &str,
        namespace: Option<&str>,
        secs: i64,
        details: Vec<SimpleFieldChange>,
    ) -> SimpleChange {
        SimpleChange {
            change_type,
            resource_id: id.to_string(),
            resource_type: resource_type.to_string(),
            resource_name: name.to_string(),
            namespace: namespace.map(|s| s.to_string()),
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            details,
        }
    }

    fn field(field: &str, old: f64, new: f64) -> SimpleFieldChange {
        SimpleFieldChange {
            field: field.to_string(),
            old_value: Some(driftwatch_model::ConfigValue::Number(old)),
            new_value: Some(driftwatch_model::ConfigValue::Number(new)),
        }
    }

    // S1 — scaling event correlates the deployment with its rolling pod.
    #[tokio::test]
    async fn s1_scaling_correlates_deployment_and_pod() {
        let changes = vec![
            change(
                ChangeType::Modified,
                "deployment/frontend",
                "deployment",
                "frontend",
                Some("default"),
                0,
                vec![field("configuration.replicas", 3.0, 5.0)],
            ),
            change(
                ChangeType::Added,
                "pod/frontend-abc123",
                "pod",
                "frontend-abc123",
                Some("default"),
                5,
                vec![],
            ),
        ];

        let result = correlate(&changes, CorrelationConfig::default()).await.unwrap();
        assert_eq!(result.groups.len(), 1);
        let group = &result.groups[0];
        assert_eq!(group.title, "frontend Scaling");
        assert_eq!(group.description, "Scaled from 3 to 5 replicas");
        assert_eq!(group.changes.len(), 2);
        assert_eq!(group.confidence, Confidence::High);
    }

    // S2 — config-triggered restart.
    #[tokio::test]
    async fn s2_config_update_correlates_with_dependent_deployment() {
        let changes = vec![
            change(
                ChangeType::Modified,
                "configmap/app-config",
                "configmap",
                "app-config",
                Some("default"),
                0,
                vec![],
            ),
            change(
                ChangeType::Modified,
                "deployment/app",
                "deployment",
                "app",
                Some("default"),
                30,
                vec![SimpleFieldChange {
                    field: "metadata.generation".to_string(),
                    old_value: Some(driftwatch_model::ConfigValue::Number(1.0)),
                    new_value: Some(driftwatch_model::ConfigValue::Number(2.0)),
                }],
            ),
        ];

        let result = correlate(&changes, CorrelationConfig::default()).await.unwrap();
        assert_eq!(result.groups.len(), 1);
        let group = &result.groups[0];
        assert_eq!(group.title, "app-config Update");
        assert_eq!(group.changes.len(), 2);
        assert_eq!(group.confidence, Confidence::High);
    }

    // S3 — secret rotation.
    #[tokio::test]
    async fn s3_secret_rotation_groups_all_three() {
        let changes = vec![
            change(ChangeType::Modified, "secret/a", "secret", "a", Some("default"), 0, vec![]),
            change(ChangeType::Modified, "secret/b", "secret", "b", Some("default"), 5, vec![]),
            change(ChangeType::Modified, "secret/c", "secret", "c", Some("default"), 10, vec![]),
        ];

        let result = correlate(&changes, CorrelationConfig::default()).await.unwrap();
        assert_eq!(result.groups.len(), 1);
        let group = &result.groups[0];
        assert_eq!(group.title, "Secret Rotation in default");
        assert_eq!(group.changes.len(), 3);
        assert_eq!(group.confidence, Confidence::High);
    }

    // S4 — unrelated changes outside any pattern's linkage fall into "Other Changes".
    #[tokio::test]
    async fn s4_unrelated_changes_are_ungrouped() {
        let changes = vec![
            change(
                ChangeType::Modified,
                "configmap/x",
                "configmap",
                "x",
                Some("default"),
                0,
                vec![],
            ),
            change(
                ChangeType::Modified,
                "deployment/y",
                "deployment",
                "y",
                Some("default"),
                45,
                vec![SimpleFieldChange {
                    field: "metadata.generation".to_string(),
                    old_value: Some(driftwatch_model::ConfigValue::Number(1.0)),
                    new_value: Some(driftwatch_model::ConfigValue::Number(2.0)),
                }],
            ),
        ];

        let result = correlate(&changes, CorrelationConfig::default()).await.unwrap();
        assert_eq!(result.groups.len(), 1);
        let group = &result.groups[0];
        assert_eq!(group.title, "Other Changes");
        assert_eq!(group.changes.len(), 2);
        assert_eq!(group.confidence, Confidence::Low);
    }

    // Invariant: every accepted group's resource ids are pairwise disjoint
    // from every other group's (exclusivity), and the union of all group
    // members plus the ungrouped set equals the input (completeness).
    #[tokio::test]
    async fn groups_are_mutually_exclusive_and_cover_all_changes() {
        let changes = vec![
            change(
                ChangeType::Modified,
                "deployment/frontend",
                "deployment",
                "frontend",
                Some("default"),
                0,
                vec![field("configuration.replicas", 3.0, 5.0)],
            ),
            change(
                ChangeType::Added,
                "pod/frontend-abc",
                "pod",
                "frontend-abc",
                Some("default"),
                2,
                vec![],
            ),
            change(ChangeType::Modified, "secret/a", "secret", "a", Some("ops"), 0, vec![]),
            change(ChangeType::Modified, "secret/b", "secret", "b", Some("ops"), 2, vec![]),
            change(
                ChangeType::Added,
                "service/unrelated",
                "service",
                "unrelated",
                Some("other"),
                9999,
                vec![],
            ),
        ];

        let result = correlate(&changes, CorrelationConfig::default()).await.unwrap();

        let mut seen = HashSet::new();
        for group in &result.groups {
            for id in group.resource_ids() {
                assert!(seen.insert(id.to_string()), "resource {id} claimed by more than one group");
            }
        }
        assert_eq!(seen.len(), changes.len());
    }

    #[test]
    fn partition_groups_by_resource_type_and_namespace() {
        let changes = vec![
            change(ChangeType::Modified, "a", "deployment", "a", Some("ns1"), 0, vec![]),
            change(ChangeType::Modified, "b", "deployment", "b", Some("ns1"), 0, vec![]),
            change(ChangeType::Modified, "c", "service", "c", Some("ns2"), 0, vec![]),
        ];
        let partitions = partition_changes(&changes);
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[&("deployment".to_string(), Some("ns1".to_string()))].len(), 2);
    }
}
