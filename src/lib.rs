//! Argo CD Operator Library
//!
//! This library provides the core functionality for the Argo CD operator.
//! Unit tests live next to the code they cover; API-level tests are under `tests/`.
//!
//! ## Quick Start
//!
//! ```rust
//! use argocd_operator::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod resources;
pub mod runtime;
pub mod webhook;
