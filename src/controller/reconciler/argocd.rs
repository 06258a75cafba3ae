//! # ArgoCD Reconciler
//!
//! Namespaced installations: workloads run next to the `ArgoCD` resource.

use super::install::{reconcile_install, InstallResource};
use super::types::{OperatorError, Reconciler};
use crate::config::ImageDefaults;
use crate::crd::{ArgoCD, ArgoCDStatus};
use crate::resources::Install;
use kube::api::Api;
use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use std::sync::Arc;

impl InstallResource for ArgoCD {
    fn to_install(&self, images: &ImageDefaults) -> Result<Install, OperatorError> {
        Install::from_argocd(self, images)
    }

    fn argocd_status(&self) -> Option<&ArgoCDStatus> {
        self.status.as_ref()
    }

    fn api(client: Client, obj: &Self) -> Api<Self> {
        match obj.namespace() {
            Some(ns) => Api::namespaced(client, &ns),
            None => Api::default_namespaced(client),
        }
    }
}

/// Reconcile an `ArgoCD` resource
pub async fn reconcile_argocd(
    argocd: Arc<ArgoCD>,
    ctx: Arc<Reconciler>,
) -> Result<Action, OperatorError> {
    reconcile_install(argocd, ctx).await
}
