//! # ArgoCD Spec
//!
//! The `ArgoCD` resource: a namespaced Argo CD installation.

use super::agent::ArgoCDAgentSpec;
use super::components::{
    ApplicationControllerSpec, ArgoCDApplicationSetSpec, ArgoCDHASpec, ArgoCDNetworkPolicySpec,
    ArgoCDNotificationsSpec, ArgoCDPrometheusSpec, ArgoCDRBACSpec, ArgoCDRedisSpec,
    ArgoCDRepoSpec, ArgoCDServerSpec, ArgoCDTLSSpec, BannerSpec, ManagedNamespaceSpec,
    NodePlacementSpec, SSHHostsSpec,
};
use super::sso::ArgoCDSSOSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ArgoCD Custom Resource Definition
///
/// Declares one Argo CD installation in the namespace of the resource.
///
/// # Example
///
/// ```yaml
/// apiVersion: argoproj.io/v1beta1
/// kind: ArgoCD
/// metadata:
///   name: example
///   namespace: argocd
/// spec:
///   server:
///     route:
///       enabled: true
///   controller:
///     sharding:
///       enabled: true
///       replicas: 2
///   sso:
///     provider: dex
///     dex:
///       openShiftOAuth: true
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "ArgoCD",
    group = "argoproj.io",
    version = "v1beta1",
    namespaced,
    status = "crate::crd::ArgoCDStatus",
    shortname = "argocd",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Host", "type":"string", "jsonPath":".status.host"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDSpec {
    /// Argo CD image shared by controller, server, repo, applicationset and notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub controller: ApplicationControllerSpec,
    #[serde(default)]
    pub server: ArgoCDServerSpec,
    #[serde(default)]
    pub repo: ArgoCDRepoSpec,
    #[serde(default)]
    pub redis: ArgoCDRedisSpec,
    #[serde(default)]
    pub ha: ArgoCDHASpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso: Option<ArgoCDSSOSpec>,
    #[serde(default)]
    pub rbac: ArgoCDRBACSpec,
    #[serde(default)]
    pub tls: ArgoCDTLSSpec,
    #[serde(default)]
    pub notifications: ArgoCDNotificationsSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_set: Option<ArgoCDApplicationSetSpec>,
    #[serde(default, rename = "argoCDAgent", skip_serializing_if = "Option::is_none")]
    pub argocd_agent: Option<ArgoCDAgentSpec>,
    #[serde(default)]
    pub prometheus: ArgoCDPrometheusSpec,
    #[serde(default)]
    pub network_policy: ArgoCDNetworkPolicySpec,
    /// Additional namespaces whose Applications this instance may manage
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_namespaces: Vec<String>,
    /// Namespace globs that may opt in through a NamespaceManagement resource
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespace_management: Vec<ManagedNamespaceSpec>,
    /// Merged into `argocd-cm` after every generated key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_config: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_exclusions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_inclusions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kustomize_build_options: Option<String>,
    #[serde(default)]
    pub status_badge_enabled: bool,
    #[serde(default)]
    pub users_anonymous_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<BannerSpec>,
    #[serde(default, rename = "initialSSHKnownHosts")]
    pub initial_ssh_known_hosts: SSHHostsSpec,
    /// ASCII-armored GPG public keys keyed by key ID
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub gpg_keys: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_placement: Option<NodePlacementSpec>,
    #[serde(default)]
    pub disable_admin: bool,
}

impl ArgoCDSpec {
    /// ApplicationSet controller runs unless its block says otherwise
    pub fn application_set_enabled(&self) -> bool {
        self.application_set.as_ref().is_none_or(|a| a.enabled)
    }

    pub fn sso_spec(&self) -> ArgoCDSSOSpec {
        self.sso.clone().unwrap_or_default()
    }

    pub fn agent_spec(&self) -> ArgoCDAgentSpec {
        self.argocd_agent.clone().unwrap_or_default()
    }

    /// Local repo server is deployed
    pub fn repo_enabled(&self) -> bool {
        self.repo.enabled && self.repo.remote.is_none()
    }

    /// Local redis (plain or HA) is deployed
    pub fn redis_enabled(&self) -> bool {
        self.redis.enabled && self.redis.remote.is_none()
    }
}
