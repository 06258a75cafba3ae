//! # Error Policy
//!
//! Error handling and backoff logic for the controllers.
//! Failed reconciliations requeue with a per-resource Fibonacci backoff;
//! controller stream errors are classified and logged.

use crate::constants::{DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS};
use crate::controller::reconciler::{BackoffState, OperatorError, Reconciler, TriggerSource};
use crate::observability::metrics;
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Requeue a failed resource after its next Fibonacci backoff step
///
/// Backoff state is kept per resource so one failing instance does not slow
/// down the others.
pub fn error_policy<K>(obj: Arc<K>, error: &OperatorError, ctx: Arc<Reconciler>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    let kind = K::kind(&()).to_string();
    let name = obj.name_any();
    let namespace = obj.namespace();
    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.reconciliation_error",
        resource.kind = %kind,
        resource.name = %name,
        resource.namespace = namespace.as_deref().unwrap_or(""),
        error = %error
    );
    let _guard = error_span.enter();

    metrics::increment_reconciliation_errors(&kind, error.reason());

    let (min, max) = ctx.config.try_read().map_or(
        (DEFAULT_BACKOFF_MIN_SECS, DEFAULT_BACKOFF_MAX_SECS),
        |c| (c.backoff_min_secs, c.backoff_max_secs),
    );
    let key = Reconciler::backoff_key(&kind, namespace.as_deref(), &name);
    let (backoff_secs, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states
                .entry(key)
                .or_insert_with(|| BackoffState::new(min, max));
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff states: {}, using default backoff", e);
            (max, 0)
        }
    };

    error!(
        error_count,
        "Reconciliation failed, retrying in {}s: {}", backoff_secs, error
    );
    metrics::increment_requeues_total(&kind, TriggerSource::ErrorBackoff.as_str());
    Action::requeue(Duration::from_secs(backoff_secs))
}

/// Broad classes of controller stream errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// A reconcile failed; already handled by `error_policy`
    Reconcile,
    /// Object vanished between trigger and reconcile, or the CRD is missing
    NotFound,
    /// RBAC revoked or token expired
    Unauthorized,
    /// Watch bookmark too old; the watcher relists
    Expired,
    /// API server overloaded or storage reinitializing
    Throttled,
    Other,
}

/// Classify a controller stream error from its debug representation
pub fn classify_stream_error(error: &str) -> StreamErrorKind {
    let is_not_found = error.contains("ObjectNotFound")
        || error.contains("404")
        || error.contains("not found");
    if error.contains("ReconcilerFailed") {
        StreamErrorKind::Reconcile
    } else if is_not_found {
        StreamErrorKind::NotFound
    } else if error.contains("401") || error.contains("Unauthorized") {
        StreamErrorKind::Unauthorized
    } else if error.contains("410") || error.contains("too old resource version") || error.contains("Gone") {
        StreamErrorKind::Expired
    } else if error.contains("429") || error.contains("TooManyRequests") {
        StreamErrorKind::Throttled
    } else {
        StreamErrorKind::Other
    }
}

/// Log a controller stream error at a level matching its class
pub fn log_stream_error(kind: &str, error: &str) {
    match classify_stream_error(error) {
        StreamErrorKind::Reconcile => debug!(kind, "Reconcile error already handled by error policy"),
        StreamErrorKind::NotFound => {
            debug!(kind, "Object not found, it was probably deleted: {}", error);
        }
        StreamErrorKind::Unauthorized => {
            error!(kind, "Watch unauthorized, check the operator's ClusterRole and ServiceAccount: {}", error);
        }
        StreamErrorKind::Expired => info!(kind, "Watch resource version expired, relisting"),
        StreamErrorKind::Throttled => warn!(kind, "API server throttling watch: {}", error),
        StreamErrorKind::Other => error!(kind, "Controller stream error: {}", error),
    }
}
