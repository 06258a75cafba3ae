//! # Component Specifications
//!
//! Per-component configuration blocks embedded in `ArgoCDSpec`.

use k8s_openapi::api::core::v1::{EnvVar, ResourceRequirements, Toleration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Log level accepted by every Argo CD component
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format accepted by every Argo CD component
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

/// Kubernetes Service type for exposed components
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
pub enum ServiceType {
    #[default]
    ClusterIP,
    NodePort,
    LoadBalancer,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::ClusterIP => "ClusterIP",
            ServiceType::NodePort => "NodePort",
            ServiceType::LoadBalancer => "LoadBalancer",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    #[serde(default, rename = "type")]
    pub service_type: ServiceType,
}

/// Ingress exposure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_class_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Secret holding the TLS certificate for the ingress host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_secret_name: Option<String>,
}

/// TLS termination for OpenShift routes
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RouteTermination {
    Edge,
    #[default]
    Passthrough,
    Reencrypt,
}

impl RouteTermination {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteTermination::Edge => "edge",
            RouteTermination::Passthrough => "passthrough",
            RouteTermination::Reencrypt => "reencrypt",
        }
    }
}

/// OpenShift Route exposure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub termination: RouteTermination,
}

/// Horizontal pod autoscaling for the API server
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoscaleSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_one")]
    pub min_replicas: i32,
    #[serde(default = "default_three")]
    pub max_replicas: i32,
    #[serde(default = "default_target_cpu")]
    pub target_cpu_utilization_percentage: i32,
}

impl Default for AutoscaleSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            min_replicas: 1,
            max_replicas: 3,
            target_cpu_utilization_percentage: 50,
        }
    }
}

/// Application controller sharding
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShardingSpec {
    /// Static sharding across `replicas` controller pods
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    /// Scale shards with the number of managed clusters
    /// Mutually exclusive with `enabled`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_scaling_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_shards: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_shards: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clusters_per_shard: Option<i32>,
}

impl ShardingSpec {
    pub fn dynamic_scaling(&self) -> bool {
        self.dynamic_scaling_enabled.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorsSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
}

/// Application controller configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationControllerSpec {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub processors: ProcessorsSpec,
    /// Application resync period, Kubernetes duration string (e.g. "3m")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_sync: Option<String>,
    #[serde(default)]
    pub sharding: ShardingSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

impl Default for ApplicationControllerSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: LogLevel::default(),
            log_format: LogFormat::default(),
            processors: ProcessorsSpec::default(),
            app_sync: None,
            sharding: ShardingSpec::default(),
            resources: None,
            env: Vec::new(),
        }
    }
}

impl ApplicationControllerSpec {
    /// Number of controller pods
    ///
    /// Static sharding honours `sharding.replicas`; dynamic scaling starts at
    /// `minShards` and the controller itself rebalances from there.
    pub fn replicas(&self) -> i32 {
        if self.sharding.enabled {
            self.sharding.replicas.unwrap_or(1).max(1)
        } else if self.sharding.dynamic_scaling() {
            self.sharding.min_shards.unwrap_or(1).max(1)
        } else {
            1
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDServerSpec {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    /// Serve plain HTTP (TLS terminated upstream)
    #[serde(default)]
    pub insecure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub service: ServiceSpec,
    #[serde(default)]
    pub ingress: IngressSpec,
    #[serde(default)]
    pub route: RouteSpec,
    #[serde(default)]
    pub autoscale: AutoscaleSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

impl Default for ArgoCDServerSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            replicas: None,
            insecure: false,
            host: None,
            log_level: LogLevel::default(),
            log_format: LogFormat::default(),
            service: ServiceSpec::default(),
            ingress: IngressSpec::default(),
            route: RouteSpec::default(),
            autoscale: AutoscaleSpec::default(),
            resources: None,
            env: Vec::new(),
        }
    }
}

/// Repository server configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDRepoSpec {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub mount_sa_token: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    /// Require TLS on connections from other components to the repo server
    #[serde(default, rename = "verifytls")]
    pub verify_tls: bool,
    /// Provider used to issue the repo server TLS certificate (`openshift`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autotls: Option<String>,
    /// Timeout for tool executions such as helm/kustomize, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec_timeout: Option<i32>,
    /// Address of an external repo server; disables the local one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

impl Default for ArgoCDRepoSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            replicas: None,
            log_level: LogLevel::default(),
            log_format: LogFormat::default(),
            mount_sa_token: false,
            service_account: None,
            verify_tls: false,
            autotls: None,
            exec_timeout: None,
            remote: None,
            resources: None,
            env: Vec::new(),
        }
    }
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDRedisSpec {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, rename = "disableTLSVerification")]
    pub disable_tls_verification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autotls: Option<String>,
    /// Address of an external redis; disables the local one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

impl Default for ArgoCDRedisSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            image: None,
            version: None,
            disable_tls_verification: false,
            autotls: None,
            remote: None,
            resources: None,
        }
    }
}

/// High availability (redis-ha) configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDHASpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_proxy_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_proxy_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// RBAC policy written to `argocd-rbac-cm`
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDRBACSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_matcher_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDCASpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_name: Option<String>,
}

/// TLS configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDTLSSpec {
    #[serde(default)]
    pub ca: ArgoCDCASpec,
    /// Initial contents of `argocd-tls-certs-cm`, keyed by server name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub initial_certs: BTreeMap<String, String>,
}

/// Notifications controller configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDNotificationsSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookServerSpec {
    #[serde(default)]
    pub ingress: IngressSpec,
    #[serde(default)]
    pub route: RouteSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// ApplicationSet controller configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDApplicationSetSpec {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Namespaces in which ApplicationSets may be created
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_namespaces: Vec<String>,
    /// Allowed SCM provider URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scm_providers: Vec<String>,
    #[serde(default)]
    pub webhook_server: WebhookServerSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

impl Default for ArgoCDApplicationSetSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            image: None,
            version: None,
            log_level: LogLevel::default(),
            log_format: LogFormat::default(),
            source_namespaces: Vec::new(),
            scm_providers: Vec::new(),
            webhook_server: WebhookServerSpec::default(),
            resources: None,
            env: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDPrometheusSpec {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDNetworkPolicySpec {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ArgoCDNetworkPolicySpec {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Node placement applied to every workload
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodePlacementSpec {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
}

/// Namespace glob that may opt in to management via `NamespaceManagement`
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedNamespaceSpec {
    /// Namespace name or glob (`*` matches any run of characters)
    pub name: String,
    #[serde(default)]
    pub allow_managed_by: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BannerSpec {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SSHHostsSpec {
    #[serde(default)]
    pub exclude_default_hosts: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_one() -> i32 {
    1
}

fn default_three() -> i32 {
    3
}

fn default_target_cpu() -> i32 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_replicas_follow_sharding_mode() {
        let mut controller = ApplicationControllerSpec::default();
        assert_eq!(controller.replicas(), 1);

        controller.sharding.enabled = true;
        controller.sharding.replicas = Some(3);
        assert_eq!(controller.replicas(), 3);

        controller.sharding.enabled = false;
        controller.sharding.dynamic_scaling_enabled = Some(true);
        controller.sharding.min_shards = Some(2);
        assert_eq!(controller.replicas(), 2);
    }

    #[test]
    fn test_zero_sharding_replicas_is_clamped() {
        let mut controller = ApplicationControllerSpec::default();
        controller.sharding.enabled = true;
        controller.sharding.replicas = Some(0);
        assert_eq!(controller.replicas(), 1);
    }

    #[test]
    fn test_enabled_flags_default_to_true_when_block_is_empty() {
        let server: ArgoCDServerSpec = serde_json::from_str("{}").unwrap();
        assert!(server.enabled);
        let appset: ArgoCDApplicationSetSpec = serde_json::from_str("{}").unwrap();
        assert!(appset.enabled);
        let notifications: ArgoCDNotificationsSpec = serde_json::from_str("{}").unwrap();
        assert!(!notifications.enabled);
    }
}
