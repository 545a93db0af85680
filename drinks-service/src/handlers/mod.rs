//! HTTP handlers for drinks-service.

pub mod drinks;
pub mod health;
pub mod metrics;

pub use drinks::*;
pub use health::health_check;
