//! The canonical configuration document (spec.md §6): three top-level
//! sections — `manager`, `plugins`, `routes` — deserialized from YAML.
//!
//! This is a plain-data mirror of the file on disk, not the live config any
//! component actually runs with; [`super::reconcile`] is what turns a parsed
//! [`CanonicalConfig`] into calls against a running [`driftwatch_export::Manager`].

use std::collections::BTreeMap;
use std::time::Duration;

use driftwatch_model::{ConfigValue, RoutePattern};
use serde::Deserialize;

/// `manager.pool` / `manager.queue` / `manager.timeouts` / `manager.reload`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ManagerSection {
    pub queue_capacity: Option<usize>,
    pub max_concurrent_workers: Option<usize>,
    pub poll_interval_ms: Option<u64>,
    pub cleanup_interval_ms: Option<u64>,
    pub response_retention_hours: Option<i64>,
    pub default_plugin: Option<String>,
    pub reload: ReloadSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReloadSection {
    pub enabled: bool,
    pub check_interval_secs: u64,
    pub config_path: Option<String>,
}

impl Default for ReloadSection {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_secs: 30,
            config_path: None,
        }
    }
}

impl ReloadSection {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(1))
    }
}

/// One entry of `plugins`: `name`, `version`, `enabled`, `settings`, plus
/// the optional blobs spec.md §6 lists (`credentials`, `endpoints`,
/// `rate_limit`, `security`, `monitoring`). Reload only ever reads
/// `name`/`enabled`/`settings` — the rest round-trip through `extra` so a
/// config file that carries them doesn't lose data across a `load -> dump`,
/// even though this crate does not interpret them itself.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfigEntry {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "empty_settings")]
    pub settings: ConfigValue,
    #[serde(flatten)]
    pub extra: BTreeMap<String, ConfigValue>,
}

fn default_true() -> bool {
    true
}

fn empty_settings() -> ConfigValue {
    ConfigValue::Map(BTreeMap::new())
}

/// One entry of `routes`: `{pattern, plugin_name, priority, enabled}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteEntry {
    #[serde(default)]
    pub pattern: RoutePattern,
    pub plugin_name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CanonicalConfig {
    pub manager: ManagerSection,
    pub plugins: Vec<PluginConfigEntry>,
    pub routes: Vec<RouteEntry>,
}

impl CanonicalConfig {
    /// Parses the canonical configuration document from YAML bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(bytes)
    }

    pub fn enabled_plugins(&self) -> impl Iterator<Item = &PluginConfigEntry> {
        self.plugins.iter().filter(|p| p.enabled)
    }
}
