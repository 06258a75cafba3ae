//! # NamespaceManagement
//!
//! Request from a namespace to be managed by an Argo CD instance elsewhere.

use super::status::Condition;
use serde::{Deserialize, Serialize};

/// NamespaceManagement Custom Resource Definition
///
/// Created inside the namespace that wants to be managed. The operator grants
/// the request only when the target instance lists a matching
/// `namespaceManagement` entry with `allowManagedBy: true`.
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "NamespaceManagement",
    group = "argoproj.io",
    version = "v1beta1",
    namespaced,
    status = "crate::crd::NamespaceManagementStatus",
    printcolumn = r#"{"name":"ManagedBy", "type":"string", "jsonPath":".spec.managedBy"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceManagementSpec {
    /// Namespace of the ArgoCD instance that should manage this namespace
    pub managed_by: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceManagementStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
