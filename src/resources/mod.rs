//! # Resource Builders
//!
//! Pure functions that turn an Argo CD installation into Kubernetes objects.
//! Nothing in this module talks to the API server; the reconcilers apply
//! what these builders return.
//!
//! Every object carries the standard `app.kubernetes.io/*` labels and a
//! controller owner reference to the `ArgoCD` or `ClusterArgoCD` it belongs to.

pub mod agent;
pub mod applicationset;
pub mod common;
pub mod configmaps;
pub mod controller;
pub mod dex;
pub mod network_policy;
pub mod notifications;
pub mod rbac;
pub mod redis;
pub mod repo;
pub mod secrets;
pub mod server;

pub use common::Component;

use crate::config::ImageDefaults;
use crate::controller::reconciler::types::OperatorError;
use crate::crd::{ArgoCD, ArgoCDSpec, ClusterArgoCD};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};

/// Which custom resource an install was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallKind {
    ArgoCD,
    ClusterArgoCD,
}

impl InstallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallKind::ArgoCD => "ArgoCD",
            InstallKind::ClusterArgoCD => "ClusterArgoCD",
        }
    }
}

/// One Argo CD installation, independent of the resource kind that declared it
#[derive(Debug, Clone)]
pub struct Install {
    /// Name of the owning custom resource
    pub name: String,
    /// Namespace the workloads run in
    pub namespace: String,
    pub kind: InstallKind,
    pub spec: ArgoCDSpec,
    pub owner: OwnerReference,
    pub images: ImageDefaults,
    /// SHA-256 of the repo server TLS secret, stamped on the pod template
    pub repo_tls_checksum: Option<String>,
    /// SHA-256 of the redis TLS secret, stamped on the pod template
    pub redis_tls_checksum: Option<String>,
}

impl Install {
    pub fn from_argocd(argocd: &ArgoCD, images: &ImageDefaults) -> Result<Self, OperatorError> {
        let namespace = argocd.namespace().ok_or_else(|| {
            OperatorError::InvalidResource(format!("ArgoCD {} has no namespace", argocd.name_any()))
        })?;
        let owner = argocd.controller_owner_ref(&()).ok_or_else(|| {
            OperatorError::InvalidResource(format!("ArgoCD {} has no uid yet", argocd.name_any()))
        })?;
        let status = argocd.status.as_ref();
        Ok(Self {
            name: argocd.name_any(),
            namespace,
            kind: InstallKind::ArgoCD,
            spec: argocd.spec.clone(),
            owner,
            images: images.clone(),
            repo_tls_checksum: status.and_then(|s| s.repo_tls_checksum.clone()),
            redis_tls_checksum: status.and_then(|s| s.redis_tls_checksum.clone()),
        })
    }

    pub fn from_cluster_argocd(
        cluster: &ClusterArgoCD,
        images: &ImageDefaults,
    ) -> Result<Self, OperatorError> {
        if cluster.spec.target_namespace.trim().is_empty() {
            return Err(OperatorError::InvalidResource(format!(
                "ClusterArgoCD {} has an empty targetNamespace",
                cluster.name_any()
            )));
        }
        let owner = cluster.controller_owner_ref(&()).ok_or_else(|| {
            OperatorError::InvalidResource(format!(
                "ClusterArgoCD {} has no uid yet",
                cluster.name_any()
            ))
        })?;
        let status = cluster.status.as_ref();
        Ok(Self {
            name: cluster.name_any(),
            namespace: cluster.spec.target_namespace.clone(),
            kind: InstallKind::ClusterArgoCD,
            spec: cluster.spec.argocd.clone(),
            owner,
            images: images.clone(),
            repo_tls_checksum: status.and_then(|s| s.repo_tls_checksum.clone()),
            redis_tls_checksum: status.and_then(|s| s.redis_tls_checksum.clone()),
        })
    }

    pub fn is_cluster_scoped(&self) -> bool {
        self.kind == InstallKind::ClusterArgoCD
    }

    /// `<instance>-<component>`
    pub fn resource_name(&self, component: Component) -> String {
        format!("{}-{}", self.name, component.as_str())
    }

    /// Name for cluster-scoped objects, unique across namespaces
    pub fn cluster_resource_name(&self, component: Component) -> String {
        format!("{}-{}-{}", self.namespace, self.name, component.as_str())
    }

    /// Argo CD image reference shared by most components
    pub fn argocd_image(&self) -> String {
        common::image_ref(
            self.spec.image.as_deref().unwrap_or(&self.images.argocd_image),
            self.spec.version.as_deref().unwrap_or(&self.images.argocd_version),
        )
    }

    /// In-cluster address of the repo server
    pub fn repo_server_address(&self) -> String {
        match &self.spec.repo.remote {
            Some(remote) => remote.clone(),
            None => format!(
                "{}.{}.svc.cluster.local:{}",
                self.resource_name(Component::RepoServer),
                self.namespace,
                crate::constants::REPO_SERVER_PORT
            ),
        }
    }

    /// In-cluster address of redis (or the HA proxy)
    pub fn redis_address(&self) -> String {
        if let Some(remote) = &self.spec.redis.remote {
            return remote.clone();
        }
        let component = if self.spec.ha.enabled {
            Component::RedisHaProxy
        } else {
            Component::Redis
        };
        format!(
            "{}.{}.svc.cluster.local:{}",
            self.resource_name(component),
            self.namespace,
            crate::constants::REDIS_PORT
        )
    }

    /// Default host of the API server when no ingress/route host is set
    pub fn server_service_host(&self) -> String {
        format!(
            "{}.{}.svc.cluster.local",
            self.resource_name(Component::Server),
            self.namespace
        )
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::crd::ClusterArgoCDSpec;

    #[test]
    fn test_install_from_argocd_uses_resource_namespace() {
        let install = install(ArgoCDSpec::default());
        assert_eq!(install.namespace, "argocd");
        assert_eq!(install.owner.kind, "ArgoCD");
        assert_eq!(install.owner.controller, Some(true));
        assert_eq!(install.resource_name(Component::Server), "example-server");
        assert_eq!(install.argocd_image(), "quay.io/argoproj/argocd:v2.13.1");
    }

    #[test]
    fn test_install_from_cluster_argocd_uses_target_namespace() {
        let mut cluster = ClusterArgoCD::new(
            "shared",
            ClusterArgoCDSpec {
                target_namespace: "argocd-shared".into(),
                argocd: ArgoCDSpec::default(),
            },
        );
        cluster.metadata.uid = Some("uid-1".into());
        let install = Install::from_cluster_argocd(&cluster, &ImageDefaults::default()).unwrap();
        assert_eq!(install.namespace, "argocd-shared");
        assert!(install.is_cluster_scoped());
        assert_eq!(
            install.cluster_resource_name(Component::ApplicationController),
            "argocd-shared-shared-application-controller"
        );
    }

    #[test]
    fn test_empty_target_namespace_is_rejected() {
        let mut cluster = ClusterArgoCD::new("shared", ClusterArgoCDSpec::default());
        cluster.metadata.uid = Some("uid-1".into());
        assert!(Install::from_cluster_argocd(&cluster, &ImageDefaults::default()).is_err());
    }

    #[test]
    fn test_addresses_follow_remote_and_ha_settings() {
        let mut spec = ArgoCDSpec::default();
        assert_eq!(
            install(spec.clone()).redis_address(),
            "example-redis.argocd.svc.cluster.local:6379"
        );
        spec.ha.enabled = true;
        assert_eq!(
            install(spec.clone()).redis_address(),
            "example-redis-ha-haproxy.argocd.svc.cluster.local:6379"
        );
        spec.repo.remote = Some("repo.example.com:8081".into());
        assert_eq!(install(spec).repo_server_address(), "repo.example.com:8081");
    }
}
