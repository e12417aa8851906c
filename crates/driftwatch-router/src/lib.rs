//! Rule-based export request router.
//!
//! Grounded in `tower-resilience-healthcheck`'s selector (a precompiled
//! strategy evaluated over a candidate list, spec.md §4.7) generalized from
//! health-endpoint selection to export-request routing: each [`Route`]
//! carries a [`pattern::CompiledPattern`] compiled once at registration
//! time instead of the "interface with a string switch" the source used
//! for field access (spec.md §9), via precompiled [`accessor::FieldAccessor`]
//! closures.

pub mod accessor;
pub mod breaker;
pub mod condition;
pub mod error;
pub mod pattern;
pub mod router;
pub mod strategy;

pub use breaker::{AlwaysAvailable, BreakerProbe, SharedBreakerProbe};
pub use condition::ConditionCompileError;
pub use error::RouterError;
pub use router::{CompiledRoute, Router, RouterBuilder};
pub use strategy::LoadBalanceStrategy;
