//! Per-call context handed to a plugin: cancellation plus whatever ambient
//! metadata the manager chooses to thread through. Kept minimal since
//! spec.md treats the plugin call signature as `(ctx, request)` without
//! elaborating on `ctx`'s contents.

use driftwatch_core::CancellationToken;

#[derive(Clone)]
pub struct ExportContext {
    pub cancellation: CancellationToken,
}

impl ExportContext {
    pub fn new(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }
}

impl Default for ExportContext {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}
