//! # ClusterArgoCD Spec
//!
//! Cluster-scoped Argo CD installation whose workloads run in a target namespace.

use super::spec::ArgoCDSpec;
use serde::{Deserialize, Serialize};

/// ClusterArgoCD Custom Resource Definition
///
/// ```yaml
/// apiVersion: argoproj.io/v1alpha1
/// kind: ClusterArgoCD
/// metadata:
///   name: shared
/// spec:
///   targetNamespace: argocd-shared
///   server:
///     insecure: true
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "ClusterArgoCD",
    group = "argoproj.io",
    version = "v1alpha1",
    status = "crate::crd::ArgoCDStatus",
    printcolumn = r#"{"name":"Target", "type":"string", "jsonPath":".spec.targetNamespace"}, {"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterArgoCDSpec {
    /// Namespace that receives the Argo CD workloads
    pub target_namespace: String,
    #[serde(flatten)]
    pub argocd: ArgoCDSpec,
}
