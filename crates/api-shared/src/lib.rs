//! # API Shared
//!
//! Shared utilities and definitions for the ward APIs.
//!
//! Contains:
//! - Request/response types with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//! - Environment-driven startup configuration (`startup` module)
//!
//! Used by `api-rest` and the `ward` CLI so both surfaces render the same shapes.

pub mod dto;
pub mod health;
pub mod startup;

pub use dto::*;
pub use health::{HealthRes, HealthService};
