//! The pattern catalog: one [`PatternMatcher`] per recognized drift shape.
//!
//! Each matcher receives the *entire* change set, not a pre-filtered slice —
//! an earlier draft partitioned changes by `(resource_type, namespace)` before
//! dispatch, but a matcher like `scaling` needs to see a deployment change and
//! an unrelated-looking pod change together, so partitioning ahead of
//! matching would have silently dropped cross-partition correlations. The
//! partition step survives only as a statistics input (see
//! [`crate::partition_changes`]).

use std::time::Duration;

use chrono::{DateTime, Utc};
use driftwatch_model::{ChangeType, SimpleChange};

/// A correlation candidate before dedup and confidence scoring.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub pattern: PatternKind,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub reason: String,
    /// Trigger change first, related changes after, in match order.
    pub changes: Vec<SimpleChange>,
}

impl Candidate {
    pub fn first_resource_id(&self) -> &str {
        self.changes[0].resource_id.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PatternKind {
    Scaling,
    ConfigUpdate,
    ServiceDeployment,
    NetworkChanges,
    StorageChanges,
    SecurityChanges,
}

impl PatternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::Scaling => "scaling",
            PatternKind::ConfigUpdate => "config_update",
            PatternKind::ServiceDeployment => "service_deployment",
            PatternKind::NetworkChanges => "network_changes",
            PatternKind::StorageChanges => "storage_changes",
            PatternKind::SecurityChanges => "security_changes",
        }
    }

    /// Stable dispatch priority, used as the primary key when sorting
    /// candidates before the dedup pass so that two candidates racing to
    /// claim the same resource resolve deterministically regardless of
    /// worker completion order.
    pub fn priority(self) -> u8 {
        match self {
            PatternKind::Scaling => 0,
            PatternKind::ConfigUpdate => 1,
            PatternKind::ServiceDeployment => 2,
            PatternKind::NetworkChanges => 3,
            PatternKind::StorageChanges => 4,
            PatternKind::SecurityChanges => 5,
        }
    }

    /// Contribution to the confidence score (spec.md §4.4 scoring table).
    /// Patterns not named in the table (network, storage, security) still
    /// carry a small implied credit rather than zero, which is what the
    /// "secret rotation" scenario requires to reach `high` — see DESIGN.md.
    pub fn score_bonus(self) -> i32 {
        match self {
            PatternKind::Scaling => 3,
            PatternKind::ConfigUpdate | PatternKind::ServiceDeployment => 2,
            PatternKind::NetworkChanges | PatternKind::StorageChanges | PatternKind::SecurityChanges => 1,
        }
    }
}

pub trait PatternMatcher: Send + Sync {
    fn pattern_type(&self) -> PatternKind;

    /// `window` is the general correlation window (default 30s); matchers
    /// with a pattern-specific window (config_update's 2-minute dependent
    /// check) use their own constant instead.
    fn find(&self, changes: &[SimpleChange]) -> Vec<Candidate>;
}

fn within(a: DateTime<Utc>, b: DateTime<Utc>, max: Duration) -> bool {
    let diff = (a - b).num_milliseconds().unsigned_abs();
    diff <= max.as_millis() as u64
}

fn fmt_value(v: &Option<driftwatch_model::ConfigValue>) -> String {
    v.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "?".to_string())
}

/// Strips a configmap/secret name down to a base that should line up with a
/// workload name (`app-config` -> `app`), so an unrelated configmap/deployment
/// pair that merely lands in the same time window doesn't get correlated.
fn config_base_name(name: &str) -> &str {
    for suffix in ["-config", "-configmap", "-secret", "-cm"] {
        if let Some(stripped) = name.strip_suffix(suffix) {
            return stripped;
        }
    }
    name
}

fn names_related(config_name: &str, workload_name: &str) -> bool {
    let base = config_base_name(config_name);
    base == workload_name
        || config_name.starts_with(&format!("{workload_name}-"))
        || workload_name.starts_with(&format!("{config_name}-"))
}

pub struct Scaling {
    pub window: Duration,
}

impl PatternMatcher for Scaling {
    fn pattern_type(&self) -> PatternKind {
        PatternKind::Scaling
    }

    fn find(&self, changes: &[SimpleChange]) -> Vec<Candidate> {
        let mut out = Vec::new();
        for c in changes.iter().filter(|c| {
            c.change_type == ChangeType::Modified
                && (c.resource_type == "deployment" || c.resource_type == "statefulset")
                && c.details.iter().any(|d| d.field.contains("replicas"))
        }) {
            let workload = c.resource_name.as_str();
            let related: Vec<&SimpleChange> = changes
                .iter()
                .filter(|o| {
                    o.resource_id != c.resource_id
                        && within(c.timestamp, o.timestamp, self.window)
                        && ((o.resource_type == "pod" && o.resource_name.starts_with(workload))
                            || o.resource_name == format!("{workload}-hpa"))
                })
                .collect();

            let mut group_changes = vec![c.clone()];
            group_changes.extend(related.into_iter().cloned());

            let replicas = c.details.iter().find(|d| d.field.contains("replicas"));
            let description = match replicas {
                Some(d) => format!(
                    "Scaled from {} to {} replicas",
                    fmt_value(&d.old_value),
                    fmt_value(&d.new_value)
                ),
                None => "Replica count changed".to_string(),
            };

            out.push(Candidate {
                pattern: PatternKind::Scaling,
                timestamp: c.timestamp,
                title: format!("{workload} Scaling"),
                description,
                reason: "replica count changed".to_string(),
                changes: group_changes,
            });
        }
        out
    }
}

pub struct ConfigUpdate;

impl PatternMatcher for ConfigUpdate {
    fn pattern_type(&self) -> PatternKind {
        PatternKind::ConfigUpdate
    }

    fn find(&self, changes: &[SimpleChange]) -> Vec<Candidate> {
        const DEPENDENT_WINDOW: Duration = Duration::from_secs(120);
        let mut out = Vec::new();

        for c in changes.iter().filter(|c| {
            c.change_type == ChangeType::Modified
                && (c.resource_type == "configmap" || c.resource_type == "secret")
        }) {
            let config_name = c.resource_name.as_str();

            let related_deployment = changes.iter().find(|o| {
                o.resource_type == "deployment"
                    && o.change_type == ChangeType::Modified
                    && within(c.timestamp, o.timestamp, DEPENDENT_WINDOW)
                    && o.details.iter().any(|d| d.field.contains("generation"))
                    && names_related(config_name, &o.resource_name)
            });

            let related_pod = changes.iter().find(|o| {
                o.resource_type == "pod"
                    && o.change_type == ChangeType::Modified
                    && o.namespace == c.namespace
                    && within(c.timestamp, o.timestamp, DEPENDENT_WINDOW)
                    && o.details
                        .iter()
                        .any(|d| d.field.contains("restart") || d.field == "status.phase")
            });

            let related_count = related_deployment.is_some() as usize + related_pod.is_some() as usize;
            if related_count == 0 {
                // No evidence of a dependent restart: not a config-update
                // correlation, let the configmap/secret change fall through
                // to the ungrouped bucket.
                continue;
            }

            let mut group_changes = vec![c.clone()];
            if let Some(d) = related_deployment {
                group_changes.push(d.clone());
            }
            if let Some(p) = related_pod {
                group_changes.push(p.clone());
            }

            out.push(Candidate {
                pattern: PatternKind::ConfigUpdate,
                timestamp: c.timestamp,
                title: format!("{config_name} Update"),
                description: format!(
                    "Configuration change triggered {related_count} dependent update(s)"
                ),
                reason: "config change correlated with dependent restart".to_string(),
                changes: group_changes,
            });
        }
        out
    }
}

pub struct ServiceDeployment {
    pub window: Duration,
}

impl PatternMatcher for ServiceDeployment {
    fn pattern_type(&self) -> PatternKind {
        PatternKind::ServiceDeployment
    }

    fn find(&self, changes: &[SimpleChange]) -> Vec<Candidate> {
        let mut out = Vec::new();
        for c in changes
            .iter()
            .filter(|c| c.change_type == ChangeType::Added && c.resource_type == "service")
        {
            let base = c.resource_name.as_str();
            let related: Vec<&SimpleChange> = changes
                .iter()
                .filter(|o| {
                    o.resource_id != c.resource_id
                        && o.change_type == ChangeType::Added
                        && o.namespace == c.namespace
                        && within(c.timestamp, o.timestamp, self.window)
                        && (o.resource_name == base
                            || o.resource_name.starts_with(&format!("{base}-")))
                })
                .collect();

            let mut group_changes = vec![c.clone()];
            group_changes.extend(related.into_iter().cloned());

            out.push(Candidate {
                pattern: PatternKind::ServiceDeployment,
                timestamp: c.timestamp,
                title: format!("{base} Deployment"),
                description: format!("New service deployment with {} related resource(s)", group_changes.len() - 1),
                reason: "service added alongside related workload resources".to_string(),
                changes: group_changes,
            });
        }
        out
    }
}

pub struct NetworkChanges {
    pub window: Duration,
}

impl PatternMatcher for NetworkChanges {
    fn pattern_type(&self) -> PatternKind {
        PatternKind::NetworkChanges
    }

    fn find(&self, changes: &[SimpleChange]) -> Vec<Candidate> {
        let mut out = Vec::new();
        for c in changes
            .iter()
            .filter(|c| c.change_type == ChangeType::Modified && c.resource_type == "ingress")
        {
            let related: Vec<&SimpleChange> = changes
                .iter()
                .filter(|o| {
                    o.resource_id != c.resource_id
                        && o.resource_type == "service"
                        && o.change_type == ChangeType::Modified
                        && o.namespace == c.namespace
                        && within(c.timestamp, o.timestamp, self.window)
                })
                .collect();
            if related.is_empty() {
                continue;
            }

            let mut group_changes = vec![c.clone()];
            group_changes.extend(related.into_iter().cloned());

            out.push(Candidate {
                pattern: PatternKind::NetworkChanges,
                timestamp: c.timestamp,
                title: format!("{} Network Changes", c.resource_name),
                description: format!("Ingress change alongside {} service change(s)", group_changes.len() - 1),
                reason: "ingress and backing service changed together".to_string(),
                changes: group_changes,
            });
        }
        out
    }
}

pub struct StorageChanges {
    pub window: Duration,
}

impl PatternMatcher for StorageChanges {
    fn pattern_type(&self) -> PatternKind {
        PatternKind::StorageChanges
    }

    fn find(&self, changes: &[SimpleChange]) -> Vec<Candidate> {
        let mut out = Vec::new();
        for c in changes.iter().filter(|c| {
            c.change_type == ChangeType::Added && c.resource_type == "persistentvolumeclaim"
        }) {
            let related: Vec<&SimpleChange> = changes
                .iter()
                .filter(|o| {
                    o.resource_id != c.resource_id
                        && o.resource_type == "persistentvolume"
                        && o.change_type == ChangeType::Added
                        && within(c.timestamp, o.timestamp, self.window)
                        && o.resource_name.contains("pvc-")
                })
                .collect();
            if related.is_empty() {
                continue;
            }

            let mut group_changes = vec![c.clone()];
            group_changes.extend(related.into_iter().cloned());

            out.push(Candidate {
                pattern: PatternKind::StorageChanges,
                timestamp: c.timestamp,
                title: format!("{} Storage Provisioning", c.resource_name),
                description: "New claim bound to a newly provisioned volume".to_string(),
                reason: "pvc added alongside a matching persistent volume".to_string(),
                changes: group_changes,
            });
        }
        out
    }
}

pub struct SecurityChanges {
    pub window: Duration,
}

impl PatternMatcher for SecurityChanges {
    fn pattern_type(&self) -> PatternKind {
        PatternKind::SecurityChanges
    }

    fn find(&self, changes: &[SimpleChange]) -> Vec<Candidate> {
        use std::collections::BTreeMap;

        let mut by_namespace: BTreeMap<Option<String>, Vec<&SimpleChange>> = BTreeMap::new();
        for c in changes
            .iter()
            .filter(|c| c.change_type == ChangeType::Modified && c.resource_type == "secret")
        {
            by_namespace.entry(c.namespace.clone()).or_default().push(c);
        }

        let mut out = Vec::new();
        for (namespace, mut members) in by_namespace {
            if members.len() < 2 {
                continue;
            }
            members.sort_by_key(|c| c.timestamp);
            let earliest = members.first().unwrap().timestamp;
            let latest = members.last().unwrap().timestamp;
            if !within(earliest, latest, self.window) {
                continue;
            }

            let ns_label = namespace.clone().unwrap_or_else(|| "cluster".to_string());
            out.push(Candidate {
                pattern: PatternKind::SecurityChanges,
                timestamp: earliest,
                title: format!("Secret Rotation in {ns_label}"),
                description: format!("{} secrets modified within the correlation window", members.len()),
                reason: "multiple secrets rotated together".to_string(),
                changes: members.into_iter().cloned().collect(),
            });
        }
        out
    }
}
