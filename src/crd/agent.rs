//! # Argo CD Agent Specification
//!
//! Configuration for the principal (control plane side) and agent (workload
//! cluster side) of the Argo CD agent extension.

use super::components::{LogFormat, LogLevel, ServiceType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalNamespaceSpec {
    /// Namespaces the principal accepts agents for (globs allowed)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_namespaces: Vec<String>,
    #[serde(default)]
    pub enable_namespace_create: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalServiceSpec {
    #[serde(default, rename = "type")]
    pub service_type: ServiceType,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalServerSpec {
    /// Minimum keepalive interval accepted from agents (e.g. "30s")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive_min_interval: Option<String>,
    #[serde(default)]
    pub service: PrincipalServiceSpec,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalTLSSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
    #[serde(default, rename = "rootCASecretName", skip_serializing_if = "Option::is_none")]
    pub root_ca_secret_name: Option<String>,
    /// Let the principal generate a self-signed certificate (development only)
    #[serde(default)]
    pub insecure_generate: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalJWTSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
    #[serde(default)]
    pub insecure_generate: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub namespace: PrincipalNamespaceSpec,
    /// Authentication method string, e.g. `mtls:CN=([^,]+)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(default)]
    pub server: PrincipalServerSpec,
    #[serde(default)]
    pub tls: PrincipalTLSSpec,
    #[serde(default)]
    pub jwt: PrincipalJWTSpec,
}

/// Mode the agent runs in
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    #[default]
    Managed,
    Autonomous,
}

impl AgentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentMode::Managed => "managed",
            AgentMode::Autonomous => "autonomous",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentClientSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_server_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_server_port: Option<i32>,
    #[serde(default)]
    pub mode: AgentMode,
    /// Credential reference, e.g. `mtls:any` or `userpass:/app/config/creds/userpass.creds`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creds: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentTLSSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
    #[serde(default, rename = "rootCASecretName", skip_serializing_if = "Option::is_none")]
    pub root_ca_secret_name: Option<String>,
    /// Skip verification of the principal's certificate
    #[serde(default)]
    pub insecure: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub client: AgentClientSpec,
    #[serde(default)]
    pub tls: AgentTLSSpec,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDAgentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<PrincipalSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentSpec>,
}

impl ArgoCDAgentSpec {
    pub fn principal_enabled(&self) -> bool {
        self.principal.as_ref().is_some_and(|p| p.enabled)
    }

    pub fn agent_enabled(&self) -> bool {
        self.agent.as_ref().is_some_and(|a| a.enabled)
    }
}
