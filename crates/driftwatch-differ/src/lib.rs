//! Snapshot-vs-snapshot diff: a pure function from two [`Snapshot`]s to an
//! ordered sequence of [`SimpleChange`].
//!
//! No I/O, no grouping, no scoring — that is the correlation engine's job
//! one layer up. The only invariant this crate owns is per-id uniqueness
//! (spec.md §4.3): for a fixed input pair the same multiset of changes comes
//! out every time.

use std::collections::BTreeMap;

use chrono::Utc;
use driftwatch_core::error::{ErrorKind, HasErrorKind};
use driftwatch_model::{ChangeType, ConfigValue, Resource, SimpleChange, SimpleFieldChange, Snapshot};

#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("cannot diff snapshots from different providers: {from} vs {to}")]
    ProviderMismatch { from: String, to: String },
}

impl HasErrorKind for DiffError {
    fn kind(&self) -> ErrorKind {
        match self {
            DiffError::ProviderMismatch { .. } => ErrorKind::Validation,
        }
    }
}

/// Diffs two snapshots of the same provider, producing one [`SimpleChange`]
/// per resource that was added, removed, or modified.
///
/// `diff(a, a)` is always empty. `details` on a `Modified` change lists every
/// changed field with its old and new value; fields are compared across
/// `configuration`, `tags`, and `metadata.version` (per
/// [`Resource::drift_eq`]), never `metadata.collection_duration_ms`.
pub fn diff(a: &Snapshot, b: &Snapshot) -> Result<Vec<SimpleChange>, DiffError> {
    if a.provider != b.provider {
        return Err(DiffError::ProviderMismatch {
            from: a.provider.clone(),
            to: b.provider.clone(),
        });
    }

    let a_by_id = a.resource_ids();
    let b_by_id = b.resource_ids();
    let mut changes = Vec::new();

    for (id, resource) in &b_by_id {
        if !a_by_id.contains_key(id) {
            changes.push(added_change(resource, b.timestamp));
        }
    }

    for (id, resource) in &a_by_id {
        if !b_by_id.contains_key(id) {
            changes.push(removed_change(resource, b.timestamp));
        }
    }

    for (id, old) in &a_by_id {
        if let Some(new) = b_by_id.get(id) {
            if !old.drift_eq(new) {
                changes.push(modified_change(old, new, b.timestamp));
            }
        }
    }

    Ok(changes)
}

fn added_change(resource: &Resource, timestamp: chrono::DateTime<Utc>) -> SimpleChange {
    SimpleChange {
        change_type: ChangeType::Added,
        resource_id: resource.id.clone(),
        resource_type: resource.resource_type.clone(),
        resource_name: resource.name.clone(),
        namespace: resource.namespace.clone(),
        timestamp,
        details: Vec::new(),
    }
}

fn removed_change(resource: &Resource, timestamp: chrono::DateTime<Utc>) -> SimpleChange {
    SimpleChange {
        change_type: ChangeType::Removed,
        resource_id: resource.id.clone(),
        resource_type: resource.resource_type.clone(),
        resource_name: resource.name.clone(),
        namespace: resource.namespace.clone(),
        timestamp,
        details: Vec::new(),
    }
}

fn modified_change(
    old: &Resource,
    new: &Resource,
    timestamp: chrono::DateTime<Utc>,
) -> SimpleChange {
    let mut details = Vec::new();
    diff_map("configuration", &old.configuration, &new.configuration, &mut details);
    diff_map("tags", &old.tags, &new.tags, &mut details);
    if old.metadata.version != new.metadata.version {
        details.push(SimpleFieldChange {
            field: "metadata.version".to_string(),
            old_value: old.metadata.version.clone().map(ConfigValue::String),
            new_value: new.metadata.version.clone().map(ConfigValue::String),
        });
    }

    SimpleChange {
        change_type: ChangeType::Modified,
        resource_id: new.id.clone(),
        resource_type: new.resource_type.clone(),
        resource_name: new.name.clone(),
        namespace: new.namespace.clone(),
        timestamp,
        details,
    }
}

fn diff_map(
    prefix: &str,
    old: &BTreeMap<String, ConfigValue>,
    new: &BTreeMap<String, ConfigValue>,
    out: &mut Vec<SimpleFieldChange>,
) {
    for (key, new_value) in new {
        match old.get(key) {
            None => out.push(SimpleFieldChange {
                field: format!("{prefix}.{key}"),
                old_value: None,
                new_value: Some(new_value.clone()),
            }),
            Some(old_value) if old_value != new_value => out.push(SimpleFieldChange {
                field: format!("{prefix}.{key}"),
                old_value: Some(old_value.clone()),
                new_value: Some(new_value.clone()),
            }),
            Some(_) => {}
        }
    }
    for (key, old_value) in old {
        if !new.contains_key(key) {
            out.push(SimpleFieldChange {
                field: format!("{prefix}.{key}"),
                old_value: Some(old_value.clone()),
                new_value: None,
            });
        }
    }
}
