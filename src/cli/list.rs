//! # List Command

use super::ResourceType;
use anyhow::{Context, Result};
use argocd_operator::crd::{ArgoCD, ArgoCDStatus, ClusterArgoCD, NamespaceManagement};
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};

/// One table row for an install
fn install_row(name: &str, location: &str, status: Option<&ArgoCDStatus>) -> String {
    let (phase, host) = status.map_or(("-".to_string(), "-".to_string()), |s| {
        (s.phase.to_string(), s.host.clone().unwrap_or_else(|| "-".to_string()))
    });
    format!("{name:<30} {location:<25} {phase:<12} {host}")
}

pub async fn list_command(
    client: Client,
    resource_type: ResourceType,
    namespace: Option<String>,
) -> Result<()> {
    let lp = ListParams::default();
    match resource_type {
        ResourceType::ArgoCD => {
            let api: Api<ArgoCD> = match &namespace {
                Some(ns) => Api::namespaced(client, ns),
                None => Api::all(client),
            };
            let items = api.list(&lp).await.context("Failed to list ArgoCD resources")?.items;
            if items.is_empty() {
                println!("No ArgoCD resources found.");
                return Ok(());
            }
            println!("{:<30} {:<25} {:<12} HOST", "NAME", "NAMESPACE", "PHASE");
            for item in &items {
                let ns = item.namespace().unwrap_or_default();
                println!("{}", install_row(&item.name_any(), &ns, item.status.as_ref()));
            }
        }
        ResourceType::ClusterArgoCD => {
            let api: Api<ClusterArgoCD> = Api::all(client);
            let items = api
                .list(&lp)
                .await
                .context("Failed to list ClusterArgoCD resources")?
                .items;
            if items.is_empty() {
                println!("No ClusterArgoCD resources found.");
                return Ok(());
            }
            println!("{:<30} {:<25} {:<12} HOST", "NAME", "TARGET", "PHASE");
            for item in &items {
                println!(
                    "{}",
                    install_row(&item.name_any(), &item.spec.target_namespace, item.status.as_ref())
                );
            }
        }
        ResourceType::NamespaceManagement => {
            let api: Api<NamespaceManagement> = match &namespace {
                Some(ns) => Api::namespaced(client, ns),
                None => Api::all(client),
            };
            let items = api
                .list(&lp)
                .await
                .context("Failed to list NamespaceManagement resources")?
                .items;
            if items.is_empty() {
                println!("No NamespaceManagement resources found.");
                return Ok(());
            }
            println!("{:<30} {:<25} {:<25} READY", "NAME", "NAMESPACE", "MANAGED BY");
            for item in &items {
                let ready = item
                    .status
                    .as_ref()
                    .and_then(|s| s.conditions.iter().find(|c| c.r#type == "Ready"))
                    .map_or("Unknown", |c| c.status.as_str());
                println!(
                    "{:<30} {:<25} {:<25} {}",
                    item.name_any(),
                    item.namespace().unwrap_or_default(),
                    item.spec.managed_by,
                    ready
                );
            }
        }
    }
    Ok(())
}
