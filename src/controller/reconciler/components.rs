//! # Component Reconciliation
//!
//! Applies every enabled Argo CD component of an install and removes the
//! ones that were switched off. Each step returns the component's phase as
//! read from the object the API server handed back.

use super::apply::{
    apply_cluster, apply_dynamic, apply_namespaced, delete_cluster, delete_dynamic,
    delete_namespaced,
};
use super::status::{deployment_phase, stateful_set_phase, worst, ComponentPhases};
use super::types::OperatorError;
use crate::crd::ComponentPhase;
use crate::resources::common::service_account;
use crate::resources::{
    agent, applicationset, controller, network_policy, notifications, rbac, redis, repo, server,
    Component, Install,
};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{ConfigMap, Service, ServiceAccount};
use k8s_openapi::api::networking::v1::{Ingress, NetworkPolicy};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use kube::api::DynamicObject;
use kube::Client;
use tracing::{debug, warn};

/// Outcome of applying the workloads
#[derive(Debug, Clone, Default)]
pub struct ComponentReport {
    pub phases: ComponentPhases,
    pub host: String,
}

/// Components that run a workload when enabled
pub fn workload_components(install: &Install) -> Vec<(Component, bool)> {
    let spec = &install.spec;
    let agent = spec.agent_spec();
    let ha = spec.redis_enabled() && spec.ha.enabled;
    vec![
        (Component::ApplicationController, spec.controller.enabled),
        (Component::Server, spec.server.enabled),
        (Component::RepoServer, spec.repo_enabled()),
        (Component::Redis, spec.redis_enabled() && !ha),
        (Component::RedisHa, ha),
        (Component::RedisHaProxy, ha),
        (Component::Dex, spec.sso_spec().dex_enabled()),
        (Component::Notifications, spec.notifications.enabled),
        (Component::ApplicationSet, spec.application_set_enabled()),
        (Component::Principal, agent.principal_enabled()),
        (Component::Agent, agent.agent_enabled()),
    ]
}

/// Apply (or remove) every component except SSO, which has its own reconciler
pub async fn reconcile_components(
    client: &Client,
    install: &Install,
) -> Result<ComponentReport, OperatorError> {
    let spec = &install.spec;
    let mut report = ComponentReport {
        host: server::host(install),
        ..Default::default()
    };

    report.phases.application_controller = if spec.controller.enabled {
        apply_application_controller(client, install).await?
    } else {
        remove_workload(client, install, Component::ApplicationController).await?;
        ComponentPhase::Unknown
    };

    report.phases.repo = if spec.repo_enabled() {
        apply_repo_server(client, install).await?
    } else {
        remove_workload(client, install, Component::RepoServer).await?;
        ComponentPhase::Unknown
    };

    report.phases.redis = if spec.redis_enabled() {
        apply_redis(client, install).await?
    } else {
        for component in [Component::Redis, Component::RedisHa, Component::RedisHaProxy] {
            remove_workload(client, install, component).await?;
        }
        ComponentPhase::Unknown
    };

    report.phases.server = if spec.server.enabled {
        let (phase, host) = apply_server(client, install).await?;
        report.host = host;
        phase
    } else {
        remove_workload(client, install, Component::Server).await?;
        remove_exposure(client, install, Component::Server).await?;
        ComponentPhase::Unknown
    };

    report.phases.notifications_controller = if spec.notifications.enabled {
        apply_notifications(client, install).await?
    } else {
        remove_workload(client, install, Component::Notifications).await?;
        ComponentPhase::Unknown
    };

    report.phases.application_set_controller = if spec.application_set_enabled() {
        apply_application_set(client, install).await?
    } else {
        remove_workload(client, install, Component::ApplicationSet).await?;
        remove_exposure(client, install, Component::ApplicationSet).await?;
        ComponentPhase::Unknown
    };

    let agent_spec = spec.agent_spec();
    report.phases.principal = if agent_spec.principal_enabled() {
        apply_principal(client, install).await?
    } else {
        remove_workload(client, install, Component::Principal).await?;
        ComponentPhase::Unknown
    };
    report.phases.agent = if agent_spec.agent_enabled() {
        apply_agent(client, install).await?
    } else {
        remove_workload(client, install, Component::Agent).await?;
        ComponentPhase::Unknown
    };

    reconcile_network_policies(client, install).await?;
    if install.is_cluster_scoped() {
        reconcile_cluster_rbac(client, install).await?;
    }
    Ok(report)
}

/// ServiceAccount plus a Role/RoleBinding when the component needs API access
///
/// Components covered by a ClusterRole in cluster installs skip the Role.
pub async fn apply_identity(
    client: &Client,
    install: &Install,
    component: Component,
) -> Result<(), OperatorError> {
    apply_namespaced(client, &service_account(install, component)).await?;
    let cluster_covered =
        install.is_cluster_scoped() && rbac::cluster_components(install).contains(&component);
    if rbac::policy_rules(component).is_empty() || cluster_covered {
        return Ok(());
    }
    apply_namespaced(client, &rbac::role(install, component)).await?;
    apply_namespaced(client, &rbac::role_binding(install, component)).await?;
    Ok(())
}

async fn apply_application_controller(
    client: &Client,
    install: &Install,
) -> Result<ComponentPhase, OperatorError> {
    apply_identity(client, install, Component::ApplicationController).await?;
    apply_namespaced(client, &controller::metrics(install)).await?;
    let sts = apply_namespaced(client, &controller::stateful_set(install)).await?;
    Ok(stateful_set_phase(&sts))
}

async fn apply_repo_server(
    client: &Client,
    install: &Install,
) -> Result<ComponentPhase, OperatorError> {
    // A custom service account is the user's to manage
    if install.spec.repo.service_account.is_none() {
        apply_namespaced(client, &service_account(install, Component::RepoServer)).await?;
    }
    apply_namespaced(client, &repo::service_for(install)).await?;
    apply_namespaced(client, &repo::metrics(install)).await?;
    let deploy = apply_namespaced(client, &repo::deployment_for(install)).await?;
    Ok(deployment_phase(&deploy))
}

async fn apply_redis(client: &Client, install: &Install) -> Result<ComponentPhase, OperatorError> {
    apply_namespaced(client, &service_account(install, Component::Redis)).await?;
    if install.spec.ha.enabled {
        delete_namespaced::<Deployment>(client, &install.namespace, &install.resource_name(Component::Redis))
            .await?;
        delete_namespaced::<Service>(client, &install.namespace, &install.resource_name(Component::Redis))
            .await?;
        apply_namespaced(client, &redis::ha_headless_service(install)).await?;
        let sts = apply_namespaced(client, &redis::ha_stateful_set(install)).await?;
        apply_namespaced(client, &redis::haproxy_config(install)).await?;
        apply_namespaced(client, &redis::haproxy_service(install)).await?;
        let proxy = apply_namespaced(client, &redis::haproxy_deployment(install)).await?;
        Ok(worst(stateful_set_phase(&sts), deployment_phase(&proxy)))
    } else {
        remove_workload(client, install, Component::RedisHa).await?;
        remove_workload(client, install, Component::RedisHaProxy).await?;
        apply_namespaced(client, &redis::service_for(install)).await?;
        let deploy = apply_namespaced(client, &redis::deployment_for(install)).await?;
        Ok(deployment_phase(&deploy))
    }
}

async fn apply_server(
    client: &Client,
    install: &Install,
) -> Result<(ComponentPhase, String), OperatorError> {
    let spec = &install.spec.server;
    apply_identity(client, install, Component::Server).await?;
    apply_namespaced(client, &server::service_for(install)).await?;
    apply_namespaced(client, &server::metrics(install)).await?;
    let deploy = apply_namespaced(client, &server::deployment_for(install)).await?;

    let name = install.resource_name(Component::Server);
    if spec.autoscale.enabled {
        apply_namespaced(client, &server::autoscaler(install)).await?;
    } else {
        delete_namespaced::<HorizontalPodAutoscaler>(client, &install.namespace, &name).await?;
    }

    let mut host = server::host(install);
    if spec.ingress.enabled {
        apply_namespaced(client, &server::server_ingress(install)).await?;
    } else {
        delete_namespaced::<Ingress>(client, &install.namespace, &name).await?;
    }
    if spec.route.enabled {
        if let Some(route) = apply_route(client, &server::server_route(install)).await? {
            if let Some(route_host) = route.data["spec"]["host"].as_str() {
                host = route_host.to_string();
            }
        }
    } else {
        delete_dynamic(client, &server::route_api_resource(), &install.namespace, &name).await?;
    }
    Ok((deployment_phase(&deploy), host))
}

/// Apply a Route; `None` when the cluster has no Route API
async fn apply_route(
    client: &Client,
    route: &DynamicObject,
) -> Result<Option<DynamicObject>, OperatorError> {
    match apply_dynamic(client, &server::route_api_resource(), route).await {
        Ok(applied) => Ok(Some(applied)),
        Err(OperatorError::Kube(kube::Error::Api(e))) if e.code == 404 => {
            warn!("Route requested but route.openshift.io/v1 is not served by this cluster");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn apply_notifications(
    client: &Client,
    install: &Install,
) -> Result<ComponentPhase, OperatorError> {
    apply_identity(client, install, Component::Notifications).await?;
    apply_namespaced(client, &notifications::config_map(install)).await?;
    apply_namespaced(client, &notifications::secret(install)).await?;
    apply_namespaced(client, &notifications::metrics(install)).await?;
    let deploy = apply_namespaced(client, &notifications::deployment_for(install)).await?;
    Ok(deployment_phase(&deploy))
}

async fn apply_application_set(
    client: &Client,
    install: &Install,
) -> Result<ComponentPhase, OperatorError> {
    let webhook = install
        .spec
        .application_set
        .clone()
        .unwrap_or_default()
        .webhook_server;
    apply_identity(client, install, Component::ApplicationSet).await?;
    apply_namespaced(client, &applicationset::webhook_service(install)).await?;
    let deploy = apply_namespaced(client, &applicationset::deployment_for(install)).await?;

    let name = install.resource_name(Component::ApplicationSet);
    if webhook.ingress.enabled {
        apply_namespaced(client, &applicationset::webhook_ingress(install)).await?;
    } else {
        delete_namespaced::<Ingress>(client, &install.namespace, &name).await?;
    }
    if webhook.route.enabled {
        apply_route(client, &applicationset::webhook_route(install)).await?;
    } else {
        delete_dynamic(client, &server::route_api_resource(), &install.namespace, &name).await?;
    }
    Ok(deployment_phase(&deploy))
}

async fn apply_principal(
    client: &Client,
    install: &Install,
) -> Result<ComponentPhase, OperatorError> {
    apply_identity(client, install, Component::Principal).await?;
    apply_namespaced(client, &agent::principal_config_map(install)).await?;
    apply_namespaced(client, &agent::principal_service(install)).await?;
    let deploy = apply_namespaced(client, &agent::principal_deployment(install)).await?;
    Ok(deployment_phase(&deploy))
}

async fn apply_agent(client: &Client, install: &Install) -> Result<ComponentPhase, OperatorError> {
    apply_identity(client, install, Component::Agent).await?;
    apply_namespaced(client, &agent::agent_config_map(install)).await?;
    let deploy = apply_namespaced(client, &agent::agent_deployment(install)).await?;
    Ok(deployment_phase(&deploy))
}

/// Delete the workload, services, identity and params of a disabled component
///
/// Configuration the user may have edited (`argocd-notifications-cm` and
/// friends) is kept.
pub async fn remove_workload(
    client: &Client,
    install: &Install,
    component: Component,
) -> Result<(), OperatorError> {
    let ns = install.namespace.as_str();
    let name = install.resource_name(component);
    let mut deleted = false;
    match component {
        Component::ApplicationController => {
            deleted |= delete_namespaced::<StatefulSet>(client, ns, &name).await?;
        }
        Component::RedisHa => {
            deleted |= delete_namespaced::<StatefulSet>(client, ns, &format!("{name}-server")).await?;
        }
        _ => {
            deleted |= delete_namespaced::<Deployment>(client, ns, &name).await?;
        }
    }
    deleted |= delete_namespaced::<Service>(client, ns, &name).await?;
    deleted |= delete_namespaced::<Service>(client, ns, &format!("{name}-metrics")).await?;
    deleted |= delete_namespaced::<NetworkPolicy>(client, ns, &format!("{name}-network-policy")).await?;
    match component {
        // The HA pods share the redis service account
        Component::RedisHa => {}
        Component::RedisHaProxy => {
            deleted |= delete_namespaced::<ConfigMap>(client, ns, &name).await?;
        }
        Component::Principal | Component::Agent => {
            deleted |= delete_namespaced::<ConfigMap>(client, ns, &format!("{name}-params")).await?;
            deleted |= remove_identity(client, install, component).await?;
        }
        _ => {
            deleted |= remove_identity(client, install, component).await?;
        }
    }
    if deleted {
        debug!(component = component.as_str(), "Removed disabled component");
    }
    Ok(())
}

async fn remove_identity(
    client: &Client,
    install: &Install,
    component: Component,
) -> Result<bool, OperatorError> {
    let ns = install.namespace.as_str();
    let name = install.resource_name(component);
    let mut deleted = delete_namespaced::<RoleBinding>(client, ns, &name).await?;
    deleted |= delete_namespaced::<Role>(client, ns, &name).await?;
    deleted |= delete_namespaced::<ServiceAccount>(client, ns, &name).await?;
    Ok(deleted)
}

async fn remove_exposure(
    client: &Client,
    install: &Install,
    component: Component,
) -> Result<(), OperatorError> {
    let name = install.resource_name(component);
    delete_namespaced::<Ingress>(client, &install.namespace, &name).await?;
    delete_dynamic(client, &server::route_api_resource(), &install.namespace, &name).await?;
    if component == Component::Server {
        delete_namespaced::<HorizontalPodAutoscaler>(client, &install.namespace, &name).await?;
    }
    Ok(())
}

async fn reconcile_network_policies(
    client: &Client,
    install: &Install,
) -> Result<(), OperatorError> {
    let enabled = install.spec.network_policy.enabled;
    for (component, running) in workload_components(install) {
        let policy = network_policy::policy(install, component);
        if enabled && running {
            apply_namespaced(client, &policy).await?;
        } else if let Some(name) = policy.metadata.name.as_deref() {
            delete_namespaced::<NetworkPolicy>(client, &install.namespace, name).await?;
        }
    }
    Ok(())
}

/// ClusterRoles and bindings of a cluster-scoped install
async fn reconcile_cluster_rbac(client: &Client, install: &Install) -> Result<(), OperatorError> {
    let wanted = rbac::cluster_components(install);
    for component in [
        Component::ApplicationController,
        Component::Server,
        Component::Principal,
    ] {
        if wanted.contains(&component) {
            apply_cluster(client, &rbac::cluster_role(install, component)).await?;
            apply_cluster(client, &rbac::cluster_role_binding(install, component)).await?;
        } else {
            remove_cluster_rbac(client, install, component).await?;
        }
    }
    Ok(())
}

pub async fn remove_cluster_rbac(
    client: &Client,
    install: &Install,
    component: Component,
) -> Result<(), OperatorError> {
    let name = install.cluster_resource_name(component);
    delete_cluster::<ClusterRoleBinding>(client, &name).await?;
    delete_cluster::<ClusterRole>(client, &name).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ArgoCDSpec;
    use crate::resources::test_support::install;

    fn enabled(install: &Install) -> Vec<Component> {
        workload_components(install)
            .into_iter()
            .filter_map(|(c, on)| on.then_some(c))
            .collect()
    }

    #[test]
    fn test_default_install_runs_core_components() {
        let components = enabled(&install(ArgoCDSpec::default()));
        assert_eq!(
            components,
            vec![
                Component::ApplicationController,
                Component::Server,
                Component::RepoServer,
                Component::Redis,
                Component::ApplicationSet,
            ]
        );
    }

    #[test]
    fn test_ha_replaces_plain_redis() {
        let mut spec = ArgoCDSpec::default();
        spec.ha.enabled = true;
        let components = enabled(&install(spec));
        assert!(!components.contains(&Component::Redis));
        assert!(components.contains(&Component::RedisHa));
        assert!(components.contains(&Component::RedisHaProxy));
    }

    #[test]
    fn test_remote_redis_runs_nothing_locally() {
        let mut spec = ArgoCDSpec::default();
        spec.ha.enabled = true;
        spec.redis.remote = Some("redis.example.com:6379".into());
        let components = enabled(&install(spec));
        assert!(!components.contains(&Component::Redis));
        assert!(!components.contains(&Component::RedisHa));
    }
}
