//! # Custom Resource Definitions
//!
//! CRD types managed by the operator.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `ArgoCD`, the namespaced installation
//! - `cluster.rs` - `ClusterArgoCD`, the cluster-scoped installation
//! - `namespace_management.rs` - `NamespaceManagement` opt-in requests
//! - `components.rs` - Per-component configuration blocks
//! - `sso.rs` - Dex / Keycloak configuration
//! - `agent.rs` - Argo CD agent principal and agent configuration
//! - `status.rs` - Status types and conditions

mod agent;
mod cluster;
mod components;
mod namespace_management;
mod spec;
mod sso;
mod status;

pub use agent::{
    AgentClientSpec, AgentMode, AgentSpec, AgentTLSSpec, ArgoCDAgentSpec, PrincipalJWTSpec,
    PrincipalNamespaceSpec, PrincipalServerSpec, PrincipalServiceSpec, PrincipalSpec,
    PrincipalTLSSpec,
};
pub use cluster::{ClusterArgoCD, ClusterArgoCDSpec};
pub use components::{
    ApplicationControllerSpec, ArgoCDApplicationSetSpec, ArgoCDCASpec, ArgoCDHASpec,
    ArgoCDNetworkPolicySpec, ArgoCDNotificationsSpec, ArgoCDPrometheusSpec, ArgoCDRBACSpec,
    ArgoCDRedisSpec, ArgoCDRepoSpec, ArgoCDServerSpec, ArgoCDTLSSpec, AutoscaleSpec, BannerSpec,
    IngressSpec, LogFormat, LogLevel, ManagedNamespaceSpec, NodePlacementSpec, ProcessorsSpec,
    RouteSpec, RouteTermination, SSHHostsSpec, ServiceSpec, ServiceType, ShardingSpec,
    WebhookServerSpec,
};
pub use namespace_management::{
    NamespaceManagement, NamespaceManagementSpec, NamespaceManagementStatus,
};
pub use spec::{ArgoCD, ArgoCDSpec};
pub use sso::{ArgoCDDexSpec, ArgoCDKeycloakSpec, ArgoCDSSOSpec, SSOProviderType};
pub use status::{set_condition, ArgoCDStatus, ComponentPhase, Condition, InstancePhase};
