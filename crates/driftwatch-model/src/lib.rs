//! Canonical data model for driftwatch.
//!
//! Every other crate in the workspace builds on the entities defined here:
//! the resource/snapshot pair collectors produce, the change records the
//! differ emits, the change groups the correlation engine assembles, the
//! timeline windows built from them, and the export/route/plugin types the
//! export runtime operates on.

pub mod change;
pub mod config_value;
pub mod export;
pub mod group;
pub mod plugin_state;
pub mod resource;
pub mod route;
pub mod snapshot;
pub mod timeline;

pub use change::{ChangeType, SimpleChange, SimpleFieldChange};
pub use config_value::ConfigValue;
pub use export::{DataType, ExportRequest, ExportResponse, ExportStatus, Priority};
pub use group::{ChangeGroup, Confidence};
pub use plugin_state::{
    CircuitBreakerSnapshot, CircuitBreakerState, HealthOverlay, PluginLifecycle, PluginState,
};
pub use resource::{Resource, ResourceMetadata};
pub use route::{ConditionOperator, Route, RouteCondition, RoutePattern};
pub use snapshot::{Snapshot, SnapshotLoadError, SnapshotMetadata};
pub use timeline::{Event, Severity, TimeWindow};
