//! # Install Pipeline
//!
//! The reconcile pipeline shared by `ArgoCD` and `ClusterArgoCD`. Both kinds
//! describe one Argo CD installation; they differ only in where the
//! workloads run and how RBAC is scoped, which `Install` already captures.

use super::apply::{apply_namespaced, clear_manual_trigger};
use super::components::{reconcile_components, remove_cluster_rbac};
use super::namespaces::{reconcile_managed_namespaces, release_all};
use super::secret::SecretReconciler;
use super::sso::SsoReconciler;
use super::status::{failed_status, patch_status, ready_status};
use super::types::{OperatorError, Reconciler, TriggerSource};
use super::validation::validate_spec;
use crate::config::ImageDefaults;
use crate::constants::{ARGOCD_FINALIZER, RECONCILE_ANNOTATION};
use crate::crd::{set_condition, ArgoCDStatus, Condition};
use crate::observability::metrics;
use crate::resources::{configmaps, Component, Install};
use kube::api::Api;
use kube::runtime::controller::Action;
use kube::runtime::finalizer::{finalizer, Event};
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

pub const SSO_CONDITION: &str = "SSOReady";

/// A custom resource that declares an Argo CD installation
pub trait InstallResource:
    Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Debug + Send + Sync + 'static
{
    /// Resolve the installation this resource declares
    fn to_install(&self, images: &ImageDefaults) -> Result<Install, OperatorError>;

    fn argocd_status(&self) -> Option<&ArgoCDStatus>;

    /// Api handle scoped to this resource
    fn api(client: kube::Client, obj: &Self) -> Api<Self>;
}

/// Result of a successful pass through the pipeline
struct Converged {
    install: Install,
    status: ArgoCDStatus,
}

pub async fn reconcile_install<K: InstallResource>(
    obj: Arc<K>,
    ctx: Arc<Reconciler>,
) -> Result<Action, OperatorError> {
    let kind = K::kind(&()).to_string();
    let span = info_span!(
        "reconcile",
        resource.kind = %kind,
        resource.name = %obj.name_any(),
        resource.namespace = obj.namespace().as_deref().unwrap_or(""),
    );
    async move {
        let start = Instant::now();
        metrics::increment_reconciliations(&kind);
        let api = K::api(ctx.client.clone(), &obj);
        let handler_ctx = Arc::clone(&ctx);
        let result = finalizer(&api, ARGOCD_FINALIZER, obj, |event| async move {
            match event {
                Event::Apply(obj) => apply(obj, handler_ctx).await,
                Event::Cleanup(obj) => cleanup(obj, handler_ctx).await,
            }
        })
        .await
        .map_err(|e| OperatorError::Finalizer(Box::new(e)));
        metrics::observe_reconciliation_duration(&kind, start.elapsed().as_secs_f64());
        result
    }
    .instrument(span)
    .await
}

async fn apply<K: InstallResource>(
    obj: Arc<K>,
    ctx: Arc<Reconciler>,
) -> Result<Action, OperatorError> {
    let kind = K::kind(&()).to_string();
    let name = obj.name_any();
    let key = Reconciler::backoff_key(&kind, obj.namespace().as_deref(), &name);
    let api = K::api(ctx.client.clone(), &obj);
    let previous = obj.argocd_status().cloned();
    let generation = obj.meta().generation;
    let (images, interval) = {
        let config = ctx.config.read().await;
        (config.images.clone(), config.reconcile_interval())
    };

    match converge(&ctx, obj.as_ref(), &images, previous.as_ref()).await {
        Ok(Converged { install, status }) => {
            if patch_status(&api, &name, previous.as_ref(), &status).await? {
                info!(phase = %status.phase, "Status updated");
            }
            if ctx.track(&key) {
                metrics::increment_managed_instances(&kind);
            }
            let trigger = if obj.annotations().contains_key(RECONCILE_ANNOTATION) {
                clear_manual_trigger(&api, &name).await?;
                TriggerSource::ManualCli
            } else {
                TriggerSource::TimerBased
            };
            ctx.reset_backoff(&key);
            metrics::increment_requeues_total(&kind, trigger.as_str());
            debug!(
                trigger = trigger.as_str(),
                namespace = %install.namespace,
                "Reconciled, requeue in {}s",
                interval.as_secs()
            );
            Ok(Action::requeue(interval))
        }
        Err(err) => {
            error!(error = %err, "Reconciliation failed");
            let status = failed_status(previous.as_ref(), &err, generation);
            if let Err(patch_err) = patch_status(&api, &name, previous.as_ref(), &status).await {
                warn!(error = %patch_err, "Failed to record failure in status");
            }
            Err(err)
        }
    }
}

async fn converge<K: InstallResource>(
    ctx: &Reconciler,
    obj: &K,
    images: &ImageDefaults,
    previous: Option<&ArgoCDStatus>,
) -> Result<Converged, OperatorError> {
    let client = &ctx.client;
    let mut install = obj.to_install(images)?;
    validate_spec(&install.spec)?;

    SecretReconciler::new(client).reconcile(&mut install).await?;
    for config_map in configmaps::all(&install) {
        apply_namespaced(client, &config_map).await?;
    }
    let report = reconcile_components(client, &install).await?;
    let sso = SsoReconciler::new(client).reconcile(&install).await?;
    let managed = reconcile_managed_namespaces(client, &install).await?;
    debug!(count = managed.len(), "Managed namespaces reconciled");

    let mut phases = report.phases;
    phases.sso = sso.phase;
    let mut status = ready_status(previous, &install, &phases, report.host, obj.meta().generation);
    match sso.message {
        Some(message) => set_condition(
            &mut status.conditions,
            Condition::new(SSO_CONDITION, false, "UnsupportedProvider", message),
        ),
        None => status.conditions.retain(|c| c.r#type != SSO_CONDITION),
    }
    Ok(Converged { install, status })
}

/// Remove what owner references cannot garbage-collect
async fn cleanup<K: InstallResource>(
    obj: Arc<K>,
    ctx: Arc<Reconciler>,
) -> Result<Action, OperatorError> {
    let kind = K::kind(&()).to_string();
    let key = Reconciler::backoff_key(&kind, obj.namespace().as_deref(), &obj.name_any());
    let images = ctx.config.read().await.images.clone();
    match obj.to_install(&images) {
        Ok(install) => {
            release_all(&ctx.client, &install).await?;
            if install.is_cluster_scoped() {
                for component in [
                    Component::ApplicationController,
                    Component::Server,
                    Component::Principal,
                ] {
                    remove_cluster_rbac(&ctx.client, &install, component).await?;
                }
            }
        }
        Err(err) => warn!(error = %err, "Nothing to clean up for an invalid resource"),
    }
    if ctx.untrack(&key) {
        metrics::decrement_managed_instances(&kind);
    }
    if let Ok(mut states) = ctx.backoff_states.lock() {
        states.remove(&key);
    }
    info!("Cleanup complete");
    Ok(Action::await_change())
}
