//! # Admission Webhook
//!
//! Validating webhook for `ArgoCD` resources.
//!
//! - `validator.rs` - `ArgoCDValidator`, the admission decision
//! - `server.rs` - TLS listener serving the validator

pub mod server;
pub mod validator;

pub use server::{load_tls_config, start_webhook_server};
pub use validator::ArgoCDValidator;

/// Path registered in the ValidatingWebhookConfiguration
pub const VALIDATE_ARGOCD_PATH: &str = "/validate-argoproj-io-v1beta1-argocd";
