//! Point-in-time [`Snapshot`] of a provider's resources.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resource::Resource;

/// A point-in-time capture of a provider's resources.
///
/// Snapshots are immutable once returned by a collector; `id` is a
/// ULID-shaped string (`{provider}-{timestamp_millis}-{rand}`) generated by
/// [`Snapshot::new`], not supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub resources: Vec<Resource>,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub collector_version: String,
    pub collection_duration_ms: u64,
    pub resource_count: usize,
    pub namespaces: Vec<String>,
    pub regions: Vec<String>,
    /// Set when the collection context was canceled mid-run; the snapshot
    /// still reflects whatever partitions completed before cancellation.
    #[serde(default)]
    pub partial: bool,
    /// Errors accumulated from individual collection partitions. Never
    /// fatal to the snapshot itself.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Current schema version for the on-disk snapshot file format.
///
/// Bumped whenever a field is added/removed/retyped in a way that is not
/// forward-compatible with `serde`'s default behavior.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// The self-describing on-disk representation of a [`Snapshot`].
///
/// Wrapping the snapshot with an explicit version lets `load` reject or
/// migrate files produced by an incompatible version instead of silently
/// misparsing them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub format_version: u32,
    pub snapshot: Snapshot,
}

impl Snapshot {
    /// Builds a new snapshot, generating a fresh ULID-shaped id.
    pub fn new(
        provider: impl Into<String>,
        timestamp: DateTime<Utc>,
        resources: Vec<Resource>,
        metadata: SnapshotMetadata,
    ) -> Self {
        let provider = provider.into();
        let id = generate_snapshot_id(&provider, timestamp);
        Self {
            id,
            timestamp,
            provider,
            resources,
            metadata,
        }
    }

    pub fn resource_ids(&self) -> BTreeMap<&str, &Resource> {
        self.resources.iter().map(|r| (r.id.as_str(), r)).collect()
    }

    /// Serializes this snapshot as a self-describing, versioned document.
    pub fn dump(&self) -> Result<String, serde_json::Error> {
        let file = SnapshotFile {
            format_version: SNAPSHOT_FORMAT_VERSION,
            snapshot: self.clone(),
        };
        serde_json::to_string_pretty(&file)
    }

    /// Parses a document produced by [`Snapshot::dump`].
    pub fn load(data: &str) -> Result<Self, SnapshotLoadError> {
        let file: SnapshotFile = serde_json::from_str(data)?;
        if file.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotLoadError::UnsupportedVersion(file.format_version));
        }
        Ok(file.snapshot)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotLoadError {
    #[error("malformed snapshot document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported snapshot format version {0}")]
    UnsupportedVersion(u32),
}

fn generate_snapshot_id(provider: &str, timestamp: DateTime<Utc>) -> String {
    let millis = timestamp.timestamp_millis();
    let rand = uuid::Uuid::new_v4().simple().to_string();
    format!("{provider}-{millis}-{}", &rand[..12])
}
