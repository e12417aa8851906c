//! The unit of parallel work the fan-out driver schedules: one
//! `(resource-type, scope)` pair, per spec.md §4.2's partitioning policy
//! ("region x resource-type for cloud; namespace x resource-type for
//! cluster").

use std::fmt;
use std::time::Duration;

use driftwatch_model::Resource;

/// Where a partition's resources come from: a region (cloud), a namespace
/// (cluster), or cluster-wide (collected once regardless of namespace
/// fan-out, e.g. persistent volumes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionAxis {
    Region(String),
    Namespace(String),
    ClusterWide,
}

impl fmt::Display for PartitionAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionAxis::Region(r) => write!(f, "region={r}"),
            PartitionAxis::Namespace(n) => write!(f, "namespace={n}"),
            PartitionAxis::ClusterWide => write!(f, "cluster-wide"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PartitionScope {
    pub resource_type: String,
    pub axis: PartitionAxis,
}

impl fmt::Display for PartitionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.axis)
    }
}

/// The outcome of collecting one partition: spec.md §4.2's
/// `{resource-type, scope, resources, error, duration}` record. Partition
/// errors are accumulated by the fan-out driver, never fatal to the whole
/// collection.
#[derive(Debug, Clone)]
pub struct PartitionResult {
    pub scope: PartitionScope,
    pub resources: Vec<Resource>,
    pub error: Option<String>,
    pub duration: Duration,
}

impl PartitionResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
