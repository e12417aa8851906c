//! The "enhanced collector" contract from spec.md §4.2.

use driftwatch_core::CancellationToken;
use driftwatch_model::Snapshot;
use futures::future::BoxFuture;

use crate::config::CollectorConfig;
use crate::error::CollectorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStatus {
    Idle,
    Collecting,
    Failed,
}

/// One provider's (or one cluster's) collector. Implementations supply the
/// provider-specific discovery and validation; the actual per-partition
/// fetch/normalize work is registered separately in a
/// [`crate::ResourceTypeRegistry`] and driven by [`crate::fanout`].
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;

    fn status(&self) -> CollectorStatus;

    fn validate(&self, config: &CollectorConfig) -> Result<(), CollectorError>;

    /// Discovers a reasonable default configuration (e.g. "every region the
    /// credentials can see") when the caller doesn't supply one explicitly.
    fn auto_discover(&self) -> BoxFuture<'_, Result<CollectorConfig, CollectorError>>;

    fn supported_regions(&self) -> Vec<String>;

    /// Runs a full collection: builds partitions from `config`, fans out
    /// under this collector's registry and parallelism bound, and folds the
    /// results into a [`Snapshot`]. A canceled `cancel` token yields a
    /// partial snapshot reflecting whatever partitions completed first.
    fn collect(
        &self,
        config: CollectorConfig,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<Snapshot, CollectorError>>;
}
