//! Per-resource-type registry: the redesign called for in spec.md §9
//! ("dynamic polymorphism by string switches on resource type ... model as
//! a registry keyed by resource type, each entry providing `fetch` and
//! `normalize`").
//!
//! Wiring a concrete cloud/cluster API to a resource type is out of this
//! crate's scope; this module only owns the registration surface a
//! concrete collector plugs into.

use std::collections::HashMap;
use std::sync::Arc;

use driftwatch_model::Resource;
use futures::future::BoxFuture;

use crate::error::CollectorError;
use crate::partition::PartitionScope;

/// An unnormalized provider response for one resource. Opaque on purpose:
/// the shape of a raw cloud/cluster API object is the concrete collector's
/// business, not this crate's.
#[derive(Debug, Clone)]
pub struct RawResource(pub driftwatch_model::ConfigValue);

pub type FetchFn =
    Arc<dyn Fn(PartitionScope) -> BoxFuture<'static, Result<Vec<RawResource>, CollectorError>> + Send + Sync>;
pub type NormalizeFn = Arc<dyn Fn(RawResource) -> Resource + Send + Sync>;

#[derive(Clone)]
pub struct ResourceTypeEntry {
    pub fetch: FetchFn,
    pub normalize: NormalizeFn,
}

/// Maps a resource-type string (`"ec2_instance"`, `"deployment"`, ...) to the
/// fetch/normalize pair that knows how to collect it. New resource kinds
/// plug in by inserting an entry; the fan-out driver never switches on the
/// resource type itself.
#[derive(Clone, Default)]
pub struct ResourceTypeRegistry {
    entries: HashMap<String, ResourceTypeEntry>,
}

impl ResourceTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        resource_type: impl Into<String>,
        fetch: FetchFn,
        normalize: NormalizeFn,
    ) {
        self.entries
            .insert(resource_type.into(), ResourceTypeEntry { fetch, normalize });
    }

    pub fn get(&self, resource_type: &str) -> Option<&ResourceTypeEntry> {
        self.entries.get(resource_type)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
