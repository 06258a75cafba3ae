//! # Argo CD Operator
//!
//! A Kubernetes operator that installs and manages Argo CD.
//!
//! ## Overview
//!
//! The operator watches three custom resources:
//!
//! 1. **ArgoCD** - a namespaced Argo CD installation
//! 2. **ClusterArgoCD** - a cluster-scoped installation running in a target namespace
//! 3. **NamespaceManagement** - a namespace asking to be managed by an existing instance
//!
//! For each installation it renders and applies the Argo CD workloads,
//! services, configuration, secrets and RBAC, then reports a phase per
//! component in the resource status.
//!
//! ## Features
//!
//! - **Server-side apply** with ownership checks on every managed object
//! - **Validating webhook** rejecting conflicting sharding settings
//! - **Prometheus metrics** and health endpoints on the metrics port
//! - **Manual reconciliation** through `argocdctl reconcile`

use anyhow::Result;
use argocd_operator::runtime::{initialize, run_watch_loop};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(
        init.client,
        init.reconciler,
        init.server_state,
        init.controller_config,
    )
    .await?;

    info!("Operator stopped");
    Ok(())
}
