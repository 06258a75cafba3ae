//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions of every operator resource as a
//! multi-document YAML stream.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/argocd-operator.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use anyhow::{Context, Result};
use argocd_operator::crd::{ArgoCD, ClusterArgoCD, NamespaceManagement};
use kube::core::CustomResourceExt;

fn main() -> Result<()> {
    let crds = [ArgoCD::crd(), ClusterArgoCD::crd(), NamespaceManagement::crd()];
    let documents = crds
        .iter()
        .map(|crd| serde_yaml::to_string(crd).context("Failed to serialize CRD"))
        .collect::<Result<Vec<_>>>()?;
    print!("{}", documents.join("---\n"));
    Ok(())
}
