//! Typed resource-level changes produced by the differ.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config_value::ConfigValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

/// A single field-level change, present only on `Modified` changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleFieldChange {
    pub field: String,
    pub old_value: Option<ConfigValue>,
    pub new_value: Option<ConfigValue>,
}

/// A single resource-level change between two snapshots.
///
/// `resource_id` is the key by which changes are deduplicated downstream —
/// the differ guarantees at most one `SimpleChange` per `resource_id` for a
/// given diff run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleChange {
    pub change_type: ChangeType,
    pub resource_id: String,
    pub resource_type: String,
    pub resource_name: String,
    pub namespace: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub details: Vec<SimpleFieldChange>,
}
