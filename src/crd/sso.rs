//! # SSO Specification
//!
//! Single sign-on provider configuration for an Argo CD instance.

use k8s_openapi::api::core::v1::{EnvVar, ResourceRequirements};
use serde::{Deserialize, Serialize};

/// Supported SSO providers
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SSOProviderType {
    Dex,
    Keycloak,
}

impl std::fmt::Display for SSOProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SSOProviderType::Dex => write!(f, "dex"),
            SSOProviderType::Keycloak => write!(f, "keycloak"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDDexSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Use the OpenShift OAuth server as the upstream connector
    #[serde(default, rename = "openShiftOAuth")]
    pub open_shift_oauth: bool,
    /// Raw dex connector configuration written to `dex.config` in `argocd-cm`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    /// OpenShift groups granted access through the OAuth connector
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDKeycloakSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, rename = "rootCA", skip_serializing_if = "Option::is_none")]
    pub root_ca: Option<String>,
    #[serde(default, rename = "verifyTLS", skip_serializing_if = "Option::is_none")]
    pub verify_tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// SSO configuration
///
/// When `provider` is unset SSO is disabled and any `dex`/`keycloak` block is
/// rejected by validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDSSOSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<SSOProviderType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dex: Option<ArgoCDDexSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keycloak: Option<ArgoCDKeycloakSpec>,
}

impl ArgoCDSSOSpec {
    pub fn dex_enabled(&self) -> bool {
        self.provider == Some(SSOProviderType::Dex)
    }
}
