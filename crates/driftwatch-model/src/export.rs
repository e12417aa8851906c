//! Export requests, responses, and the data types plugins can carry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config_value::ConfigValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    DriftReport,
    Snapshot,
    Correlation,
    Baseline,
    Timeline,
    Metrics,
    Events,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Priority {
    Low = 1,
    Normal = 5,
    High = 10,
    Critical = 15,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl ExportStatus {
    /// The transition table from spec.md §8 invariant 5: only forward
    /// transitions, plus an explicit cancel from `Pending`.
    pub fn can_transition_to(self, next: ExportStatus) -> bool {
        use ExportStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    pub id: String,
    pub plugin_name: Option<String>,
    pub format: String,
    pub data_type: DataType,
    pub data: ConfigValue,
    #[serde(default)]
    pub options: BTreeMap<String, ConfigValue>,
    pub priority: Priority,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub requested_at: DateTime<Utc>,
}

impl ExportRequest {
    /// Builds a request, generating an id if the caller didn't supply one.
    pub fn new(format: impl Into<String>, data_type: DataType, data: ConfigValue) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            plugin_name: None,
            format: format.into(),
            data_type,
            data,
            options: BTreeMap::new(),
            priority: Priority::Normal,
            is_async: false,
            requested_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub id: String,
    pub plugin_name: Option<String>,
    pub status: ExportStatus,
    pub data: Option<ConfigValue>,
    pub content_type: Option<String>,
    pub output_path: Option<String>,
    pub external_url: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, ConfigValue>,
}

impl ExportResponse {
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            plugin_name: None,
            status: ExportStatus::Pending,
            data: None,
            content_type: None,
            output_path: None,
            external_url: None,
            processed_at: None,
            duration_ms: None,
            error: None,
            metrics: BTreeMap::new(),
        }
    }
}
