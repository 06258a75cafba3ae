//! # Reconciler
//!
//! Reconciliation logic for the operator's custom resources.
//!
//! - `argocd.rs` / `cluster_argocd.rs` - entry points for the two install kinds
//! - `install.rs` - shared install pipeline, finalizer and status handling
//! - `namespace_management.rs` - opt-in requests from other namespaces
//! - `secret.rs` - `SecretReconciler`, owns `argocd-secret` and TLS checksums
//! - `sso.rs` - `SSOReconciler`, dex workload and the `sso` phase
//! - `components.rs` - workloads, services, ingress/routes, RBAC
//! - `namespaces.rs` - RBAC in managed namespaces
//! - `apply.rs` - server-side apply with ownership checks
//! - `status.rs` - component phases and status patches
//! - `validation.rs` - spec validation shared with the webhook
//! - `types.rs` - errors and the shared reconcile context

pub mod apply;
pub mod argocd;
pub mod cluster_argocd;
pub mod components;
pub mod install;
pub mod namespace_management;
pub mod namespaces;
pub mod secret;
pub mod sso;
pub mod status;
pub mod types;
pub mod validation;

pub use argocd::reconcile_argocd;
pub use cluster_argocd::reconcile_cluster_argocd;
pub use install::InstallResource;
pub use namespace_management::reconcile_namespace_management;
pub use secret::SecretReconciler;
pub use sso::SsoReconciler;
pub use types::{BackoffState, OperatorError, Reconciler, TriggerSource};
pub use validation::{validate_sharding, validate_spec, ValidationError};
