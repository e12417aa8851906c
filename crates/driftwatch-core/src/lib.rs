//! Core infrastructure shared across the driftwatch workspace.
//!
//! - [`events`]: the listener/event system every subsystem emits
//!   observability through (connection-layer state transitions, plugin
//!   lifecycle, health alerts, reload outcomes).
//! - [`error`]: the `ErrorKind` taxonomy backing every crate's `thiserror`
//!   error type.
//! - [`aimd`]: a generic AIMD controller used by retry budgets and
//!   adaptive concurrency limits.
//! - [`health_integration`]: the trait connection-layer circuit breakers
//!   implement so `driftwatch-health` can trigger them directly instead of
//!   waiting for the next failed call.

pub mod aimd;
pub mod cancel;
pub mod error;
pub mod events;
pub mod health_integration;

pub use cancel::CancellationToken;
pub use error::{ErrorKind, HasErrorKind, RemediationHint};
pub use events::{DriftEvent, EventListener, EventListeners, FnListener};
pub use health_integration::{HealthTriggerable, SharedHealthTrigger, TriggerHealth};
