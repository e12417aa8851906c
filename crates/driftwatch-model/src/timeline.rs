//! Timeline [`Event`]s and [`TimeWindow`] buckets.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config_value::ConfigValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A change lifted into timeline form. Default severity mapping from
/// `SimpleChange::change_type` is `added -> low`, `modified -> medium`,
/// `removed -> high`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub resource_id: String,
    pub resource_type: String,
    pub namespace: Option<String>,
    pub severity: Severity,
    #[serde(default)]
    pub metadata: BTreeMap<String, ConfigValue>,
}

/// A fixed-width bucket of [`Event`]s with a derived severity and summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_secs: i64,
    pub events: Vec<Event>,
    pub severity: Option<Severity>,
    pub summary: String,
}
