//! # Status Command

use super::ResourceType;
use anyhow::{Context, Result};
use argocd_operator::crd::{ArgoCD, ArgoCDStatus, ClusterArgoCD, Condition, NamespaceManagement};
use kube::api::Api;
use kube::Client;

fn print_conditions(conditions: &[Condition]) {
    if conditions.is_empty() {
        return;
    }
    println!();
    println!("Conditions:");
    for condition in conditions {
        println!("  {}: {}", condition.r#type, condition.status);
        if let Some(reason) = &condition.reason {
            println!("    Reason: {reason}");
        }
        if let Some(message) = &condition.message {
            println!("    Message: {message}");
        }
        if let Some(time) = &condition.last_transition_time {
            println!("    Last Transition: {time}");
        }
    }
}

fn print_install_status(status: Option<&ArgoCDStatus>) {
    let Some(status) = status else {
        println!();
        println!("Status: not reconciled yet");
        return;
    };
    println!();
    println!("Phase: {}", status.phase);
    if let Some(host) = &status.host {
        println!("Host: {host}");
    }
    if let Some(generation) = status.observed_generation {
        println!("Observed Generation: {generation}");
    }
    println!();
    println!("Components:");
    for (name, phase) in [
        ("applicationController", status.application_controller),
        ("applicationSetController", status.application_set_controller),
        ("server", status.server),
        ("repo", status.repo),
        ("redis", status.redis),
        ("sso", status.sso),
        ("notificationsController", status.notifications_controller),
        ("principal", status.principal),
        ("agent", status.agent),
    ] {
        println!("  {name:<26} {phase}");
    }
    print_conditions(&status.conditions);
}

pub async fn status_command(
    client: Client,
    resource_type: ResourceType,
    name: &str,
    namespace: &str,
) -> Result<()> {
    match resource_type {
        ResourceType::ArgoCD => {
            let api: Api<ArgoCD> = Api::namespaced(client, namespace);
            let argocd = api
                .get(name)
                .await
                .with_context(|| format!("Failed to get ArgoCD '{namespace}/{name}'"))?;
            println!("ArgoCD {namespace}/{name}");
            print_install_status(argocd.status.as_ref());
        }
        ResourceType::ClusterArgoCD => {
            let api: Api<ClusterArgoCD> = Api::all(client);
            let cluster = api
                .get(name)
                .await
                .with_context(|| format!("Failed to get ClusterArgoCD '{name}'"))?;
            println!("ClusterArgoCD {name} (target namespace {})", cluster.spec.target_namespace);
            print_install_status(cluster.status.as_ref());
        }
        ResourceType::NamespaceManagement => {
            let api: Api<NamespaceManagement> = Api::namespaced(client, namespace);
            let request = api
                .get(name)
                .await
                .with_context(|| format!("Failed to get NamespaceManagement '{namespace}/{name}'"))?;
            println!("NamespaceManagement {namespace}/{name}");
            println!("Managed By: {}", request.spec.managed_by);
            match &request.status {
                Some(status) => print_conditions(&status.conditions),
                None => println!("Status: not reconciled yet"),
            }
        }
    }
    Ok(())
}
