//! Health-based triggering for resilience patterns.
//!
//! This module provides a trait-based integration that allows health monitoring
//! systems to proactively control resilience patterns like circuit breakers.
//!
//! # Example
//!
//! ```rust,ignore
//! use driftwatch_core::HealthTriggerable;
//! use std::sync::Arc;
//!
//! // When health check detects an unhealthy resource
//! fn on_unhealthy(trigger: &dyn HealthTriggerable) {
//!     trigger.trigger_unhealthy();
//! }
//! ```

use std::sync::Arc;

/// Health status for triggering purposes.
///
/// This is separate from any crate-specific health status to avoid
/// coupling between resilience patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerHealth {
    /// Resource is healthy and ready for use.
    Healthy,

    /// Resource is degraded but still functional.
    Degraded,

    /// Resource is unhealthy and should not be used.
    Unhealthy,
}

/// Trait for components that can be triggered by health changes.
///
/// Implementations must be non-blocking. For async operations,
/// spawn tasks internally rather than blocking the caller.
///
/// # Thread Safety
///
/// This trait requires `Send + Sync` because health checks typically
/// run in background tasks and need to trigger multiple components.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use driftwatch_core::HealthTriggerable;
///
/// struct MyCircuitBreaker {
///     // ...
/// }
///
/// impl HealthTriggerable for MyCircuitBreaker {
///     fn trigger_unhealthy(&self) {
///         // Open the circuit immediately
///         // Use tokio::spawn for async operations
///     }
///
///     fn trigger_healthy(&self) {
///         // Close the circuit
///     }
/// }
/// ```
pub trait HealthTriggerable: Send + Sync {
    /// Called when health becomes unhealthy.
    ///
    /// This should cause the component to enter a protective state
    /// (e.g., circuit breaker opens).
    fn trigger_unhealthy(&self);

    /// Called when health becomes healthy.
    ///
    /// This should cause the component to resume normal operation
    /// (e.g., circuit breaker closes).
    fn trigger_healthy(&self);

    /// Called when health becomes degraded.
    ///
    /// Default implementation is a no-op since degraded services
    /// are typically still usable. Override if your component needs
    /// special handling for degraded state.
    fn trigger_degraded(&self) {}
}

/// Shared reference to a health trigger.
///
/// Use this type when storing triggers in collections or passing
/// them between components.
pub type SharedHealthTrigger = Arc<dyn HealthTriggerable>;
