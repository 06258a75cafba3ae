//! # NamespaceManagement Reconciler
//!
//! A namespace asks to be managed by the Argo CD instance in
//! `spec.managedBy`. The request is granted only when that instance lists a
//! `namespaceManagement` entry matching the namespace with
//! `allowManagedBy: true`.

use super::apply::clear_manual_trigger;
use super::namespaces::{glob_matches, grant, revoke, set_managed_by_label};
use super::types::{OperatorError, Reconciler, TriggerSource};
use crate::config::ImageDefaults;
use crate::constants::{NAMESPACE_MANAGEMENT_FINALIZER, RECONCILE_ANNOTATION};
use crate::crd::{
    set_condition, ArgoCD, ArgoCDSpec, Condition, NamespaceManagement, NamespaceManagementStatus,
};
use crate::observability::metrics;
use crate::resources::Install;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::runtime::finalizer::{finalizer, Event};
use kube::{Client, Resource, ResourceExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

pub const READY_CONDITION: &str = "Ready";

const KIND: &str = "NamespaceManagement";

/// Outcome of matching a request against the instances in `managedBy`
#[derive(Debug)]
pub enum Decision<'a> {
    ArgoCDNotFound,
    NotAllowed(String),
    Managed(&'a ArgoCD),
}

impl Decision<'_> {
    fn condition(&self, managed_by: &str) -> Condition {
        match self {
            Decision::ArgoCDNotFound => Condition::new(
                READY_CONDITION,
                false,
                "ArgoCDNotFound",
                format!("no ArgoCD instance found in namespace {managed_by}"),
            ),
            Decision::NotAllowed(message) => {
                Condition::new(READY_CONDITION, false, "NotAllowed", message.clone())
            }
            Decision::Managed(argocd) => Condition::new(
                READY_CONDITION,
                true,
                "Managed",
                format!("managed by ArgoCD {}/{}", managed_by, argocd.name_any()),
            ),
        }
    }
}

/// Whether an instance opts in to managing `namespace`
pub fn allows(spec: &ArgoCDSpec, namespace: &str) -> bool {
    spec.namespace_management
        .iter()
        .any(|entry| entry.allow_managed_by && glob_matches(&entry.name, namespace))
}

pub fn decide<'a>(namespace: &str, managed_by: &str, candidates: &'a [ArgoCD]) -> Decision<'a> {
    if namespace == managed_by {
        return Decision::NotAllowed(format!(
            "namespace {namespace} already hosts the instance"
        ));
    }
    if candidates.is_empty() {
        return Decision::ArgoCDNotFound;
    }
    candidates
        .iter()
        .find(|argocd| allows(&argocd.spec, namespace))
        .map_or_else(
            || {
                Decision::NotAllowed(format!(
                    "no ArgoCD in {managed_by} allows managing namespace {namespace}"
                ))
            },
            Decision::Managed,
        )
}

async fn candidates(client: &Client, managed_by: &str) -> Result<Vec<ArgoCD>, OperatorError> {
    if managed_by.trim().is_empty() {
        return Ok(Vec::new());
    }
    let api: Api<ArgoCD> = Api::namespaced(client.clone(), managed_by);
    let mut items = api.list(&ListParams::default()).await?.items;
    items.sort_by_key(|argocd| argocd.name_any());
    Ok(items)
}

/// Revoke whatever any candidate instance may have granted in `namespace`
async fn revoke_all(
    client: &Client,
    namespace: &str,
    managed_by: &str,
    candidates: &[ArgoCD],
    images: &ImageDefaults,
) -> Result<(), OperatorError> {
    for argocd in candidates {
        match Install::from_argocd(argocd, images) {
            Ok(install) => revoke(client, &install, namespace).await?,
            Err(err) => warn!(error = %err, "Skipping revoke for unusable ArgoCD"),
        }
    }
    set_managed_by_label(client, namespace, managed_by, false).await
}

pub async fn reconcile_namespace_management(
    request: Arc<NamespaceManagement>,
    ctx: Arc<Reconciler>,
) -> Result<Action, OperatorError> {
    let span = info_span!(
        "reconcile",
        resource.kind = KIND,
        resource.name = %request.name_any(),
        resource.namespace = request.namespace().as_deref().unwrap_or(""),
    );
    async move {
        let start = Instant::now();
        metrics::increment_reconciliations(KIND);
        let namespace = request.namespace().ok_or_else(|| {
            OperatorError::InvalidResource(format!("{} {} has no namespace", KIND, request.name_any()))
        })?;
        let api: Api<NamespaceManagement> = Api::namespaced(ctx.client.clone(), &namespace);
        let handler_ctx = Arc::clone(&ctx);
        let result = finalizer(&api, NAMESPACE_MANAGEMENT_FINALIZER, request, |event| async move {
            match event {
                Event::Apply(request) => apply(request, handler_ctx).await,
                Event::Cleanup(request) => cleanup(request, handler_ctx).await,
            }
        })
        .await
        .map_err(|e| OperatorError::Finalizer(Box::new(e)));
        metrics::observe_reconciliation_duration(KIND, start.elapsed().as_secs_f64());
        result
    }
    .instrument(span)
    .await
}

async fn apply(
    request: Arc<NamespaceManagement>,
    ctx: Arc<Reconciler>,
) -> Result<Action, OperatorError> {
    let client = &ctx.client;
    let name = request.name_any();
    let namespace = request.namespace().unwrap_or_default();
    let managed_by = request.spec.managed_by.as_str();
    let (images, interval, waiting) = {
        let config = ctx.config.read().await;
        (config.images.clone(), config.reconcile_interval(), config.waiting_requeue())
    };

    let found = candidates(client, managed_by).await?;
    let decision = decide(&namespace, managed_by, &found);
    match &decision {
        Decision::Managed(argocd) => {
            let install = Install::from_argocd(argocd, &images)?;
            set_managed_by_label(client, &namespace, managed_by, true).await?;
            grant(client, &install, &namespace).await?;
            debug!(instance = %install.name, "Namespace granted");
        }
        Decision::NotAllowed(reason) => {
            info!(reason = %reason, "Namespace management denied");
            revoke_all(client, &namespace, managed_by, &found, &images).await?;
        }
        Decision::ArgoCDNotFound => {
            set_managed_by_label(client, &namespace, managed_by, false).await?;
        }
    }

    let api: Api<NamespaceManagement> = Api::namespaced(client.clone(), &namespace);
    let previous = request.status.clone();
    let mut status = previous.clone().unwrap_or_default();
    set_condition(&mut status.conditions, decision.condition(managed_by));
    status.observed_generation = request.meta().generation;
    if previous.as_ref() != Some(&status) {
        patch_status(&api, &name, &status).await?;
    }

    let key = Reconciler::backoff_key(KIND, Some(&namespace), &name);
    ctx.reset_backoff(&key);
    let manual = request.annotations().contains_key(RECONCILE_ANNOTATION);
    if manual {
        clear_manual_trigger(&api, &name).await?;
    }
    let (trigger, requeue) = match decision {
        Decision::ArgoCDNotFound => (TriggerSource::WaitingForResource, waiting),
        _ if manual => (TriggerSource::ManualCli, interval),
        _ => (TriggerSource::TimerBased, interval),
    };
    metrics::increment_requeues_total(KIND, trigger.as_str());
    Ok(Action::requeue(requeue))
}

async fn cleanup(
    request: Arc<NamespaceManagement>,
    ctx: Arc<Reconciler>,
) -> Result<Action, OperatorError> {
    let namespace = request.namespace().unwrap_or_default();
    let managed_by = request.spec.managed_by.as_str();
    let images = ctx.config.read().await.images.clone();
    let found = candidates(&ctx.client, managed_by).await?;
    revoke_all(&ctx.client, &namespace, managed_by, &found, &images).await?;
    info!("Namespace released");
    Ok(Action::await_change())
}

async fn patch_status(
    api: &Api<NamespaceManagement>,
    name: &str,
    status: &NamespaceManagementStatus,
) -> Result<(), OperatorError> {
    let patch = serde_json::json!({ "status": status });
    api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ManagedNamespaceSpec;
    use crate::resources::test_support::argocd;

    fn opt_in(pattern: &str, allow: bool) -> ArgoCD {
        let spec = ArgoCDSpec {
            namespace_management: vec![ManagedNamespaceSpec {
                name: pattern.to_string(),
                allow_managed_by: allow,
            }],
            ..Default::default()
        };
        argocd("example", "argocd", spec)
    }

    #[test]
    fn test_missing_instance_waits() {
        assert!(matches!(
            decide("team-a", "argocd", &[]),
            Decision::ArgoCDNotFound
        ));
    }

    #[test]
    fn test_matching_glob_is_managed() {
        let candidates = vec![opt_in("team-*", true)];
        assert!(matches!(
            decide("team-a", "argocd", &candidates),
            Decision::Managed(_)
        ));
    }

    #[test]
    fn test_allow_flag_is_required() {
        let candidates = vec![opt_in("team-*", false)];
        assert!(matches!(
            decide("team-a", "argocd", &candidates),
            Decision::NotAllowed(_)
        ));
    }

    #[test]
    fn test_non_matching_namespace_is_denied() {
        let candidates = vec![opt_in("team-*", true)];
        assert!(matches!(
            decide("other", "argocd", &candidates),
            Decision::NotAllowed(_)
        ));
    }

    #[test]
    fn test_instance_namespace_cannot_opt_in() {
        let candidates = vec![opt_in("*", true)];
        assert!(matches!(
            decide("argocd", "argocd", &candidates),
            Decision::NotAllowed(_)
        ));
    }

    #[test]
    fn test_conditions_carry_reasons() {
        let candidates = vec![opt_in("team-*", true)];
        let managed = decide("team-a", "argocd", &candidates).condition("argocd");
        assert_eq!(managed.status, "True");
        assert_eq!(managed.reason.as_deref(), Some("Managed"));
        let missing = Decision::ArgoCDNotFound.condition("argocd");
        assert_eq!(missing.status, "False");
        assert_eq!(missing.reason.as_deref(), Some("ArgoCDNotFound"));
    }
}
