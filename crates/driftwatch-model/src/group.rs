//! [`ChangeGroup`]: the correlation engine's output unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::change::SimpleChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Maps a raw confidence score (see the correlation engine's scoring
    /// rules) onto a discrete level: `>= 7` high, `>= 4` medium, else low.
    pub fn from_score(score: i32) -> Self {
        if score >= 7 {
            Confidence::High
        } else if score >= 4 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// A human-meaningful grouping of related [`SimpleChange`]s.
///
/// Invariant (enforced by the correlator, not by this type): across all
/// groups produced by one correlation run, each `resource_id` appears in at
/// most one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeGroup {
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub changes: Vec<SimpleChange>,
    pub reason: String,
    pub confidence: Confidence,
}

impl ChangeGroup {
    pub fn resource_ids(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|c| c.resource_id.as_str())
    }
}
