//! [`Route`] entity: the data a router selects against.
//!
//! The router crate (`driftwatch-router`) owns compilation and matching;
//! this type is the plain-data shape stored in configuration and reported
//! back through status APIs.

use serde::{Deserialize, Serialize};

use crate::config_value::ConfigValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    Contains,
    Regex,
    In,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCondition {
    pub field_path: String,
    pub operator: ConditionOperator,
    pub value: ConfigValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutePattern {
    pub data_type: Option<String>,
    pub format: Option<String>,
    /// Supports `*` and glob-style wildcards, matched by the router.
    pub destination: Option<String>,
    pub priority: Option<i32>,
    /// Tag subset: key must be present; value matches, with `*` wildcard.
    pub tags: Vec<(String, String)>,
    pub conditions: Vec<RouteCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub pattern: RoutePattern,
    pub plugin_name: String,
    pub priority: i32,
    pub enabled: bool,
    #[serde(default)]
    pub match_count: u64,
    pub last_matched: Option<chrono::DateTime<chrono::Utc>>,
}
