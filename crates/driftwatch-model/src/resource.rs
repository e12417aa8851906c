//! The canonical [`Resource`] entity every collector produces.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config_value::ConfigValue;

/// A single infrastructure resource observed by a collector.
///
/// `id` is stable and provider-scoped: it is unique within a [`crate::Snapshot`]
/// but carries no meaning across providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub provider: String,
    pub namespace: Option<String>,
    pub region: Option<String>,
    pub configuration: BTreeMap<String, ConfigValue>,
    pub tags: BTreeMap<String, ConfigValue>,
    pub metadata: ResourceMetadata,
}

/// Provider-supplied metadata about a resource.
///
/// `collection_duration` is deliberately excluded from [`Resource::drift_eq`]:
/// it differs between any two real collections of the same resource and must
/// never itself register as drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub created_at: Option<DateTime<Utc>>,
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_duration_ms: Option<u64>,
    /// Opaque provider-specific blob, passed through unexamined.
    #[serde(default)]
    pub provider_data: BTreeMap<String, ConfigValue>,
}

impl Resource {
    /// Equality for diffing purposes: considers `configuration`, `tags`, and
    /// `metadata.version`, but deliberately ignores collection timing so that
    /// re-collecting an unchanged resource never produces a spurious change.
    pub fn drift_eq(&self, other: &Resource) -> bool {
        self.configuration == other.configuration
            && self.tags == other.tags
            && self.metadata.version == other.metadata.version
    }
}
