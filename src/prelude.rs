//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use argocd_operator::prelude::*;
//! ```
//!
//! This brings into scope the CRD types, the reconcilers and their error
//! type, the configuration types and the admission validator.

pub use crate::crd::*;

pub use crate::controller::reconciler::{
    reconcile_argocd, reconcile_cluster_argocd, reconcile_namespace_management, BackoffState,
    InstallResource, OperatorError, Reconciler, SecretReconciler, SsoReconciler, TriggerSource,
    ValidationError,
};

pub use crate::config::{
    ControllerConfig, ImageDefaults, ServerConfig, SharedControllerConfig, SharedServerConfig,
};

pub use crate::resources::{Component, Install};

pub use crate::webhook::ArgoCDValidator;
