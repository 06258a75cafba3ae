//! # Reconcile Command
//!
//! Sets the reconcile annotation; the operator reconciles on the resulting
//! watch event and clears the annotation afterwards.

use super::ResourceType;
use anyhow::{Context, Result};
use argocd_operator::constants::RECONCILE_ANNOTATION;
use argocd_operator::crd::{ArgoCD, ClusterArgoCD, NamespaceManagement};
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use serde_json::json;

pub async fn reconcile_command(
    client: Client,
    resource_type: ResourceType,
    name: &str,
    namespace: &str,
) -> Result<()> {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let patch = json!({
        "metadata": { "annotations": { RECONCILE_ANNOTATION: timestamp } }
    });
    let pp = PatchParams::default();
    let target = match resource_type {
        ResourceType::ArgoCD => {
            let api: Api<ArgoCD> = Api::namespaced(client, namespace);
            api.patch(name, &pp, &Patch::Merge(&patch))
                .await
                .with_context(|| format!("Failed to annotate ArgoCD '{namespace}/{name}'"))?;
            format!("ArgoCD {namespace}/{name}")
        }
        ResourceType::ClusterArgoCD => {
            let api: Api<ClusterArgoCD> = Api::all(client);
            api.patch(name, &pp, &Patch::Merge(&patch))
                .await
                .with_context(|| format!("Failed to annotate ClusterArgoCD '{name}'"))?;
            format!("ClusterArgoCD {name}")
        }
        ResourceType::NamespaceManagement => {
            let api: Api<NamespaceManagement> = Api::namespaced(client, namespace);
            api.patch(name, &pp, &Patch::Merge(&patch))
                .await
                .with_context(|| {
                    format!("Failed to annotate NamespaceManagement '{namespace}/{name}'")
                })?;
            format!("NamespaceManagement {namespace}/{name}")
        }
    };

    println!("Reconciliation triggered for {target}");
    println!("  Annotation: {RECONCILE_ANNOTATION}={timestamp}");
    Ok(())
}
