//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use super::{env_var_opt, env_var_or_default, env_var_or_default_bool, env_var_or_default_str};
use crate::constants::*;
use std::time::Duration;

/// Default images used when an ArgoCD resource does not pin one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDefaults {
    pub argocd_image: String,
    pub argocd_version: String,
    pub redis_image: String,
    pub redis_version: String,
    pub haproxy_image: String,
    pub haproxy_version: String,
    pub dex_image: String,
    pub dex_version: String,
    pub agent_image: String,
    pub agent_version: String,
}

impl Default for ImageDefaults {
    fn default() -> Self {
        Self {
            argocd_image: DEFAULT_ARGOCD_IMAGE.to_string(),
            argocd_version: DEFAULT_ARGOCD_VERSION.to_string(),
            redis_image: DEFAULT_REDIS_IMAGE.to_string(),
            redis_version: DEFAULT_REDIS_VERSION.to_string(),
            haproxy_image: DEFAULT_HAPROXY_IMAGE.to_string(),
            haproxy_version: DEFAULT_HAPROXY_VERSION.to_string(),
            dex_image: DEFAULT_DEX_IMAGE.to_string(),
            dex_version: DEFAULT_DEX_VERSION.to_string(),
            agent_image: DEFAULT_AGENT_IMAGE.to_string(),
            agent_version: DEFAULT_AGENT_VERSION.to_string(),
        }
    }
}

impl ImageDefaults {
    /// Load image defaults, letting `DEFAULT_*_IMAGE`/`DEFAULT_*_VERSION` override them
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            argocd_image: env_var_or_default_str("DEFAULT_ARGOCD_IMAGE", &d.argocd_image),
            argocd_version: env_var_or_default_str("DEFAULT_ARGOCD_VERSION", &d.argocd_version),
            redis_image: env_var_or_default_str("DEFAULT_REDIS_IMAGE", &d.redis_image),
            redis_version: env_var_or_default_str("DEFAULT_REDIS_VERSION", &d.redis_version),
            haproxy_image: env_var_or_default_str("DEFAULT_HAPROXY_IMAGE", &d.haproxy_image),
            haproxy_version: env_var_or_default_str("DEFAULT_HAPROXY_VERSION", &d.haproxy_version),
            dex_image: env_var_or_default_str("DEFAULT_DEX_IMAGE", &d.dex_image),
            dex_version: env_var_or_default_str("DEFAULT_DEX_VERSION", &d.dex_version),
            agent_image: env_var_or_default_str("DEFAULT_AGENT_IMAGE", &d.agent_image),
            agent_version: env_var_or_default_str("DEFAULT_AGENT_VERSION", &d.agent_version),
        }
    }
}

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Restrict the operator to a single namespace (`WATCH_NAMESPACE`)
    /// When unset, ArgoCD resources are watched cluster-wide
    pub watch_namespace: Option<String>,
    /// Namespace the operator itself runs in
    pub operator_namespace: String,
    /// Requeue interval after a successful reconciliation (seconds)
    pub reconcile_interval_secs: u64,
    /// Requeue interval while waiting on a dependency such as a missing ArgoCD (seconds)
    pub waiting_requeue_secs: u64,
    /// Fibonacci backoff lower bound (seconds)
    pub backoff_min_secs: u64,
    /// Fibonacci backoff upper bound (seconds)
    pub backoff_max_secs: u64,
    /// Delay before restarting a controller stream that ended (seconds)
    pub watch_restart_delay_secs: u64,
    /// Maximum concurrent reconciliations per controller
    pub max_concurrent_reconciliations: u16,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable metrics collection
    pub enable_metrics: bool,
    /// Default images
    pub images: ImageDefaults,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            operator_namespace: "argocd-operator-system".to_string(),
            reconcile_interval_secs: DEFAULT_RECONCILE_INTERVAL_SECS,
            waiting_requeue_secs: DEFAULT_WAITING_REQUEUE_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
            enable_metrics: true,
            images: ImageDefaults::default(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            watch_namespace: env_var_opt("WATCH_NAMESPACE"),
            operator_namespace: env_var_or_default_str("POD_NAMESPACE", &d.operator_namespace),
            reconcile_interval_secs: env_var_or_default(
                "RECONCILE_INTERVAL_SECS",
                d.reconcile_interval_secs,
            ),
            waiting_requeue_secs: env_var_or_default(
                "WAITING_REQUEUE_SECS",
                d.waiting_requeue_secs,
            ),
            backoff_min_secs: env_var_or_default("BACKOFF_MIN_SECS", d.backoff_min_secs),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", d.backoff_max_secs),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                d.watch_restart_delay_secs,
            ),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                d.max_concurrent_reconciliations,
            ),
            log_level: env_var_or_default_str("LOG_LEVEL", &d.log_level),
            log_format: env_var_or_default_str("LOG_FORMAT", &d.log_format),
            enable_metrics: env_var_or_default_bool("ENABLE_METRICS", d.enable_metrics),
            images: ImageDefaults::from_env(),
        }
    }

    /// Get the successful reconciliation requeue duration
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    /// Get the waiting-for-dependency requeue duration
    pub fn waiting_requeue(&self) -> Duration {
        Duration::from_secs(self.waiting_requeue_secs)
    }

    /// Get watch restart delay duration
    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}
