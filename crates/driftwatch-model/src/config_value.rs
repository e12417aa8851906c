//! Redaction-aware configuration values.
//!
//! Resource configuration is opaque string-to-value data pulled from provider
//! APIs. [`ConfigValue`] mirrors a JSON value closely enough to round-trip
//! whatever a collector hands it, but adds a `Secret` variant that can only be
//! constructed already redacted: the key name survives, the value never does.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single configuration or tag value.
///
/// `Secret` is intentionally impossible to construct with a value attached —
/// [`ConfigValue::redacted_secret`] is the only constructor, and it discards
/// the secret payload before it ever reaches this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigValue {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    List(Vec<ConfigValue>),
    Map(BTreeMap<String, ConfigValue>),
    /// A secret field. Only the originating key name is retained.
    Secret { key: String },
}

impl ConfigValue {
    /// Builds a redacted secret placeholder. There is no way to recover the
    /// original value through this type — callers must never pass the secret
    /// value itself to this constructor.
    pub fn redacted_secret(key: impl Into<String>) -> Self {
        ConfigValue::Secret { key: key.into() }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, ConfigValue::Secret { .. })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => write!(f, "{s}"),
            ConfigValue::Number(n) => write!(f, "{n}"),
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Null => write!(f, "null"),
            ConfigValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            ConfigValue::Map(_) => write!(f, "<map>"),
            ConfigValue::Secret { key } => write!(f, "<redacted:{key}>"),
        }
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Number(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}
