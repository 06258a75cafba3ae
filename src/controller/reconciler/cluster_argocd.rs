//! # ClusterArgoCD Reconciler
//!
//! Cluster-scoped installations deploy into `spec.targetNamespace` and get
//! ClusterRoles for the controller and server instead of namespaced Roles.

use super::install::{reconcile_install, InstallResource};
use super::types::{OperatorError, Reconciler};
use crate::config::ImageDefaults;
use crate::crd::{ArgoCDStatus, ClusterArgoCD};
use crate::resources::Install;
use kube::api::Api;
use kube::runtime::controller::Action;
use kube::Client;
use std::sync::Arc;

impl InstallResource for ClusterArgoCD {
    fn to_install(&self, images: &ImageDefaults) -> Result<Install, OperatorError> {
        Install::from_cluster_argocd(self, images)
    }

    fn argocd_status(&self) -> Option<&ArgoCDStatus> {
        self.status.as_ref()
    }

    fn api(client: Client, _obj: &Self) -> Api<Self> {
        Api::all(client)
    }
}

pub async fn reconcile_cluster_argocd(
    cluster: Arc<ClusterArgoCD>,
    ctx: Arc<Reconciler>,
) -> Result<Action, OperatorError> {
    reconcile_install(cluster, ctx).await
}
