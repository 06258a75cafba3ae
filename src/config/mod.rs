//! # Configuration
//!
//! Operator-level settings loaded from environment variables.
//!
//! - `controller.rs` - reconciliation, backoff, logging and default images
//! - `server.rs` - metrics/health server and validating webhook listener
//!
//! Both configurations are shared behind `Arc<RwLock<_>>` so every
//! controller reads the same values.

mod controller;
mod server;

pub use controller::{ControllerConfig, ImageDefaults};
pub use server::ServerConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Controller configuration shared across controllers
pub type SharedControllerConfig = Arc<RwLock<ControllerConfig>>;

/// Server configuration shared with the HTTP and webhook servers
pub type SharedServerConfig = Arc<RwLock<ServerConfig>>;

/// Load both configurations from the environment and wrap them for sharing
#[must_use]
pub fn create_shared_config() -> (SharedControllerConfig, SharedServerConfig) {
    (
        Arc::new(RwLock::new(ControllerConfig::from_env())),
        Arc::new(RwLock::new(ServerConfig::from_env())),
    )
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
pub(crate) fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| parse_bool(&v))
        .unwrap_or(default)
}

/// Read environment variable as string or return default
pub(crate) fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an optional, non-empty environment variable
pub(crate) fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
