//! # Server Configuration
//!
//! Settings for the metrics/health HTTP server and the webhook listener.

use super::{env_var_or_default, env_var_or_default_bool, env_var_or_default_str};
use crate::constants::*;
use std::path::PathBuf;
use std::time::Duration;

/// HTTP and webhook server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// How long to wait for the HTTP server to bind at startup
    pub startup_timeout_secs: u64,
    /// Readiness poll interval while waiting for the server
    pub poll_interval_ms: u64,
    /// Serve the validating admission webhook
    pub enable_webhook: bool,
    /// HTTPS port of the validating webhook
    pub webhook_port: u16,
    /// Directory containing `tls.crt` and `tls.key`
    pub webhook_cert_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
            enable_webhook: false,
            webhook_port: DEFAULT_WEBHOOK_PORT,
            webhook_cert_dir: PathBuf::from(DEFAULT_WEBHOOK_CERT_DIR),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            metrics_port: env_var_or_default("METRICS_PORT", d.metrics_port),
            startup_timeout_secs: env_var_or_default(
                "SERVER_STARTUP_TIMEOUT_SECS",
                d.startup_timeout_secs,
            ),
            poll_interval_ms: env_var_or_default("SERVER_POLL_INTERVAL_MS", d.poll_interval_ms),
            enable_webhook: env_var_or_default_bool("ENABLE_WEBHOOK", d.enable_webhook),
            webhook_port: env_var_or_default("WEBHOOK_PORT", d.webhook_port),
            webhook_cert_dir: PathBuf::from(env_var_or_default_str(
                "WEBHOOK_CERT_DIR",
                DEFAULT_WEBHOOK_CERT_DIR,
            )),
        }
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn webhook_cert_path(&self) -> PathBuf {
        self.webhook_cert_dir.join("tls.crt")
    }

    pub fn webhook_key_path(&self) -> PathBuf {
        self.webhook_cert_dir.join("tls.key")
    }
}
