//! # Observability
//!
//! Prometheus metrics for the operator and the admission webhook.
//!
//! - `metrics`: Prometheus metrics collection

pub mod metrics;

pub use metrics::*;
