//! # Watch Loop
//!
//! One `Controller` per custom resource kind, run concurrently. Each
//! install controller also watches the workloads it owns so a deleted or
//! edited Deployment is put back promptly. NamespaceManagement requests
//! are re-evaluated whenever an ArgoCD in their target namespace changes.

use crate::config::SharedControllerConfig;
use crate::constants::{LABEL_MANAGED_BY, MANAGED_BY_VALUE};
use crate::controller::reconciler::{
    reconcile_argocd, reconcile_cluster_argocd, reconcile_namespace_management, Reconciler,
};
use crate::controller::server::ServerState;
use crate::crd::{ArgoCD, ClusterArgoCD, NamespaceManagement};
use crate::runtime::error_policy::{error_policy, log_stream_error};
use futures::{Stream, StreamExt};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::NamespaceResourceScope;
use kube::api::Api;
use kube::runtime::controller::{self, Controller};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher;
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Api scoped to `WATCH_NAMESPACE` when set
fn scoped<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

fn owned_config() -> watcher::Config {
    watcher::Config::default().labels(&format!("{LABEL_MANAGED_BY}={MANAGED_BY_VALUE}"))
}

/// Attach watches on every workload kind an install creates
fn with_owned<K>(
    controller: Controller<K>,
    client: &Client,
    namespace: Option<&str>,
) -> Controller<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    controller
        .owns(scoped::<Deployment>(client, namespace), owned_config())
        .owns(scoped::<StatefulSet>(client, namespace), owned_config())
        .owns(scoped::<Service>(client, namespace), owned_config())
        .owns(scoped::<ConfigMap>(client, namespace), owned_config())
        .owns(scoped::<Secret>(client, namespace), owned_config())
}

/// Drain a controller stream, logging each outcome
async fn drain<S, T, E>(kind: &'static str, stream: S)
where
    S: Stream<Item = Result<T, E>>,
    T: Debug,
    E: Debug,
{
    stream
        .for_each(|result| async move {
            match result {
                Ok(obj) => debug!(kind, object = ?obj, "Reconciled"),
                Err(e) => log_stream_error(kind, &format!("{e:?}")),
            }
        })
        .await;
}

/// Requests naming the namespace of `argocd` in `managedBy`
pub fn requests_for(
    requests: &[Arc<NamespaceManagement>],
    argocd: &ArgoCD,
) -> Vec<ObjectRef<NamespaceManagement>> {
    let Some(namespace) = argocd.namespace() else {
        return Vec::new();
    };
    requests
        .iter()
        .filter(|request| request.spec.managed_by == namespace)
        .map(|request| ObjectRef::from_obj(request.as_ref()))
        .collect()
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Resolves once shutdown has been requested on `rx`
pub async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Run all controllers until a shutdown signal arrives
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    controller_config: SharedControllerConfig,
) -> Result<(), anyhow::Error> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal, initiating graceful shutdown...");
        shutdown_state.set_ready(false);
        let _ = shutdown_tx.send(true);
    });

    loop {
        let (watch_namespace, concurrency, restart_delay) = {
            let config = controller_config.read().await;
            (
                config.watch_namespace.clone(),
                config.max_concurrent_reconciliations,
                config.watch_restart_delay(),
            )
        };
        let ns = watch_namespace.as_deref();
        let controller_config = controller::Config::default().concurrency(concurrency);
        match ns {
            Some(ns) => info!(namespace = ns, "Starting controllers for a single namespace"),
            None => info!("Starting controllers cluster-wide"),
        }

        let argocd = with_owned(
            Controller::new(scoped::<ArgoCD>(&client, ns), watcher::Config::default().any_semantic()),
            &client,
            ns,
        )
        .with_config(controller_config.clone())
        .graceful_shutdown_on(wait_for_shutdown(shutdown_rx.clone()))
        .run(reconcile_argocd, error_policy::<ArgoCD>, Arc::clone(&reconciler));

        // Workloads of a ClusterArgoCD live in its target namespace, so its
        // owned watches are always cluster-wide
        let cluster = with_owned(
            Controller::new(
                Api::<ClusterArgoCD>::all(client.clone()),
                watcher::Config::default().any_semantic(),
            ),
            &client,
            None,
        )
        .with_config(controller_config.clone())
        .graceful_shutdown_on(wait_for_shutdown(shutdown_rx.clone()))
        .run(
            reconcile_cluster_argocd,
            error_policy::<ClusterArgoCD>,
            Arc::clone(&reconciler),
        );

        let requests = Controller::new(
            Api::<NamespaceManagement>::all(client.clone()),
            watcher::Config::default().any_semantic(),
        );
        let store = requests.store();
        let requests = requests
            .watches(
                scoped::<ArgoCD>(&client, ns),
                watcher::Config::default().any_semantic(),
                move |argocd| requests_for(&store.state(), &argocd),
            )
            .with_config(controller_config)
            .graceful_shutdown_on(wait_for_shutdown(shutdown_rx.clone()))
            .run(
                reconcile_namespace_management,
                error_policy::<NamespaceManagement>,
                Arc::clone(&reconciler),
            );

        tokio::join!(
            drain("ArgoCD", argocd),
            drain("ClusterArgoCD", cluster),
            drain("NamespaceManagement", requests),
        );

        if *shutdown_rx.borrow() || !server_state.ready() {
            break;
        }
        warn!(
            "Controller streams ended, restarting in {} seconds...",
            restart_delay.as_secs()
        );
        tokio::time::sleep(restart_delay).await;
    }

    info!("Controllers stopped gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::NamespaceManagementSpec;
    use std::time::Duration;

    fn request(name: &str, managed_by: &str) -> Arc<NamespaceManagement> {
        let mut request = NamespaceManagement::new(
            name,
            NamespaceManagementSpec {
                managed_by: managed_by.to_string(),
            },
        );
        request.metadata.namespace = Some(name.to_string());
        Arc::new(request)
    }

    fn argocd(namespace: &str) -> ArgoCD {
        let mut argocd = ArgoCD::new("example", Default::default());
        argocd.metadata.namespace = Some(namespace.to_string());
        argocd
    }

    #[test]
    fn test_argocd_change_maps_to_matching_requests() {
        let requests = vec![
            request("team-a", "argocd"),
            request("team-b", "other"),
            request("team-c", "argocd"),
        ];
        let refs = requests_for(&requests, &argocd("argocd"));
        let names: Vec<_> = refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["team-a", "team-c"]);
        assert_eq!(refs[0].namespace.as_deref(), Some("team-a"));
    }

    #[test]
    fn test_argocd_without_namespace_maps_to_nothing() {
        let requests = vec![request("team-a", "argocd")];
        let argocd = ArgoCD::new("example", Default::default());
        assert!(requests_for(&requests, &argocd).is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_resolves_after_send() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(wait_for_shutdown(rx));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("shutdown future should resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_resolves_when_sender_dropped() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), wait_for_shutdown(rx))
            .await
            .expect("shutdown future should resolve");
    }
}
