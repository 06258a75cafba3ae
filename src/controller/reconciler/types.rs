//! # Types
//!
//! Core types for the reconcilers.

use super::validation::ValidationError;
use crate::config::SharedControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use kube::Client;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Invalid spec: {0}")]
    Validation(#[from] ValidationError),

    #[error("{kind} {name} is managed by {manager}, refusing to take it over")]
    OwnershipConflict {
        kind: String,
        name: String,
        manager: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Finalizer error: {0}")]
    Finalizer(#[source] Box<kube::runtime::finalizer::Error<OperatorError>>),
}

impl OperatorError {
    /// Short reason used in status conditions and metric labels
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            OperatorError::Kube(_) => "KubernetesError",
            OperatorError::InvalidResource(_) => "InvalidResource",
            OperatorError::Validation(_) => "ValidationFailed",
            OperatorError::OwnershipConflict { .. } => "OwnershipConflict",
            OperatorError::Serialization(_) => "SerializationError",
            OperatorError::Finalizer(_) => "FinalizerError",
        }
    }
}

/// Trigger source for reconciliation
/// Tracks why a reconciliation was triggered for better debugging and observability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// Manual trigger via CLI annotation (argocdctl reconcile)
    ManualCli,
    /// Timer-based periodic reconciliation (reconcile_interval)
    TimerBased,
    /// Error backoff retry (Fibonacci backoff after failure)
    ErrorBackoff,
    /// Waiting for a dependency, e.g. the ArgoCD a NamespaceManagement points at
    WaitingForResource,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::ManualCli => "manual-cli",
            TriggerSource::TimerBased => "timer-based",
            TriggerSource::ErrorBackoff => "error-backoff",
            TriggerSource::WaitingForResource => "waiting-for-resource",
        }
    }
}

/// Backoff state for a specific resource
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Shared context handed to every reconcile call
#[derive(Clone)]
pub struct Reconciler {
    pub client: Client,
    pub config: SharedControllerConfig,
    // Keyed by "<kind>/<namespace>/<name>"; owned by the error policy layer
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
    // Same keys; instances counted in the managed-instances gauge
    pub managed: Arc<Mutex<HashSet<String>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(client: Client, config: SharedControllerConfig) -> Self {
        Self {
            client,
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
            managed: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Key used for per-resource backoff bookkeeping
    #[must_use]
    pub fn backoff_key(kind: &str, namespace: Option<&str>, name: &str) -> String {
        format!("{}/{}/{}", kind, namespace.unwrap_or("_cluster"), name)
    }

    /// Record `key` as managed; returns true the first time it is seen
    pub fn track(&self, key: &str) -> bool {
        self.managed
            .lock()
            .is_ok_and(|mut managed| managed.insert(key.to_string()))
    }

    /// Stop tracking `key`; returns true if it was tracked
    pub fn untrack(&self, key: &str) -> bool {
        self.managed
            .lock()
            .is_ok_and(|mut managed| managed.remove(key))
    }

    /// Forget the error history of a resource after a successful reconcile
    pub fn reset_backoff(&self, key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(key) {
                state.reset();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_state_counts_and_resets() {
        let mut state = BackoffState::new(5, 300);
        state.increment_error();
        state.increment_error();
        assert_eq!(state.error_count, 2);
        assert_eq!(state.backoff.next_backoff_seconds(), 5);
        state.reset();
        assert_eq!(state.error_count, 0);
    }

    #[test]
    fn test_backoff_key_distinguishes_cluster_scope() {
        assert_eq!(
            Reconciler::backoff_key("ArgoCD", Some("argocd"), "example"),
            "ArgoCD/argocd/example"
        );
        assert_eq!(
            Reconciler::backoff_key("ClusterArgoCD", None, "shared"),
            "ClusterArgoCD/_cluster/shared"
        );
    }

    #[test]
    fn test_error_reasons() {
        let err = OperatorError::InvalidResource("x".into());
        assert_eq!(err.reason(), "InvalidResource");
        let err = OperatorError::Validation(ValidationError::ShardingConflict);
        assert_eq!(err.reason(), "ValidationFailed");
        assert!(err.to_string().contains("mutually exclusive"));
    }
}
