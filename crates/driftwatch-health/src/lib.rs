//! Proactive health checking for resources with intelligent selection strategies.
//!
//! This module provides a health-aware wrapper that continuously monitors the health
//! of multiple resources (Redis connections, HTTP clients, databases, etc.) and
//! intelligently selects healthy resources when requested.
//!
//! # Key Distinction
//!
//! - **Circuit Breaker** (reactive): Responds to failures after they happen
//! - **Health Check** (proactive): Continuously monitors health to prevent failures
//!
//! These patterns complement each other perfectly!
//!
//! # Examples
//!
//! ```rust
//! use driftwatch_health::{HealthCheckWrapper, HealthStatus, HealthChecker};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Define a health checker for your resource type
//! struct DbHealthChecker;
//!
//! impl HealthChecker<String> for DbHealthChecker {
//!     async fn check(&self, db: &String) -> HealthStatus {
//!         // Your health check logic here
//!         HealthStatus::Healthy
//!     }
//! }
//!
//! // Create wrapper with multiple resources
//! let wrapper = HealthCheckWrapper::builder()
//!     .with_context("primary-db".to_string(), "primary")
//!     .with_context("secondary-db".to_string(), "secondary")
//!     .with_checker(DbHealthChecker)
//!     .with_interval(Duration::from_secs(5))
//!     .build();
//!
//! // Start background health checking
//! wrapper.start().await;
//!
//! // Get a healthy resource
//! if let Some(db) = wrapper.get_healthy().await {
//!     println!("Using healthy database: {}", db);
//! }
//! # Ok(())
//! # }
//! ```

mod checker;
mod config;
mod context;
mod monitor;
mod selector;
#[cfg(feature = "triggers")]
mod triggers;
mod wrapper;

pub use checker::HealthChecker;
pub use config::{HealthCheckConfig, HealthCheckConfigBuilder};
pub use context::{HealthCheckedContext, HealthDetail};
pub use monitor::{
    AlertSeverity, HealthAlert, PluginHealthMonitor, Probeable, SystemHealth, SystemStatus,
};
pub use selector::{SelectionStrategy, Selector};
#[cfg(feature = "triggers")]
pub use triggers::notify_triggers;
pub use wrapper::{HealthCheckWrapper, HealthCheckWrapperBuilder};

/// Health status of a monitored resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Resource is healthy and ready to use
    Healthy,

    /// Resource is degraded but still functional (e.g., slow but working)
    Degraded,

    /// Resource is unhealthy and should not be used
    Unhealthy,

    /// Health status is unknown (not yet checked or check failed)
    Unknown,
}

impl HealthStatus {
    /// Check if the status indicates the resource is usable (Healthy or Degraded).
    pub fn is_usable(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    /// Check if the status indicates the resource is healthy.
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

// For atomic storage
impl From<HealthStatus> for u8 {
    fn from(status: HealthStatus) -> u8 {
        match status {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
            HealthStatus::Unknown => 3,
        }
    }
}

impl From<u8> for HealthStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => HealthStatus::Healthy,
            1 => HealthStatus::Degraded,
            2 => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        }
    }
}
