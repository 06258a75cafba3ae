//! # RBAC
//!
//! Roles, ClusterRoles and their bindings for each component's service
//! account, plus the RBAC granted inside managed namespaces.

use super::common::{cluster_metadata, labels, metadata};
use super::{Component, Install};
use k8s_openapi::api::rbac::v1::{
    ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Components that receive RBAC in namespaces they manage
pub const MANAGED_NAMESPACE_COMPONENTS: [Component; 2] =
    [Component::ApplicationController, Component::Server];

fn rule(groups: &[&str], resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(groups.iter().map(|s| s.to_string()).collect()),
        resources: Some(resources.iter().map(|s| s.to_string()).collect()),
        verbs: verbs.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

const READ: &[&str] = &["get", "list", "watch"];
const ALL: &[&str] = &["*"];

/// Rules for a component's namespaced Role; empty when it needs none
pub fn policy_rules(component: Component) -> Vec<PolicyRule> {
    match component {
        Component::ApplicationController => vec![rule(&["*"], &["*"], ALL)],
        Component::Server => vec![
            rule(&["*"], &["*"], &["get", "list", "watch", "delete", "patch"]),
            rule(&[""], &["events"], &["create", "list"]),
            rule(
                &["argoproj.io"],
                &["applications", "applicationsets", "appprojects"],
                &["create", "get", "list", "watch", "update", "delete", "patch"],
            ),
        ],
        Component::Dex => vec![rule(&[""], &["configmaps", "secrets"], READ)],
        Component::Notifications => vec![
            rule(
                &["argoproj.io"],
                &["applications", "appprojects"],
                &["get", "list", "watch", "update", "patch"],
            ),
            rule(&[""], &["configmaps", "secrets"], READ),
        ],
        Component::ApplicationSet => vec![
            rule(
                &["argoproj.io"],
                &["applications", "applicationsets", "applicationsets/finalizers", "appprojects"],
                ALL,
            ),
            rule(&[""], &["configmaps", "secrets"], READ),
            rule(&[""], &["events"], &["create", "get", "list", "patch", "watch"]),
            rule(&["coordination.k8s.io"], &["leases"], ALL),
        ],
        Component::Principal => vec![
            rule(&["argoproj.io"], &["applications", "appprojects"], ALL),
            rule(
                &[""],
                &["configmaps", "secrets"],
                &["get", "list", "watch", "create", "update", "patch"],
            ),
            rule(&[""], &["events"], &["create"]),
        ],
        Component::Agent => vec![
            rule(&["argoproj.io"], &["applications", "appprojects"], ALL),
            rule(&[""], &["configmaps", "secrets"], READ),
            rule(&[""], &["events"], &["create"]),
        ],
        Component::RepoServer
        | Component::Redis
        | Component::RedisHa
        | Component::RedisHaProxy => Vec::new(),
    }
}

/// Rules for the ClusterRole of a cluster-scoped install
pub fn cluster_policy_rules(component: Component) -> Vec<PolicyRule> {
    match component {
        Component::ApplicationController => vec![
            rule(&["*"], &["*"], ALL),
            PolicyRule {
                non_resource_urls: Some(vec!["*".to_string()]),
                verbs: vec!["*".to_string()],
                ..Default::default()
            },
        ],
        Component::Server => vec![
            rule(&["*"], &["*"], &["get", "list", "watch", "delete", "patch"]),
            rule(&["argoproj.io"], &["applications", "applicationsets"], ALL),
        ],
        Component::Principal => vec![rule(&[""], &["namespaces"], &["get", "list", "watch", "create"])],
        _ => Vec::new(),
    }
}

/// Components that get a ClusterRole in a cluster-scoped install
pub fn cluster_components(install: &Install) -> Vec<Component> {
    let mut components = Vec::new();
    if install.spec.controller.enabled {
        components.push(Component::ApplicationController);
    }
    if install.spec.server.enabled {
        components.push(Component::Server);
    }
    if install.spec.agent_spec().principal_enabled() {
        components.push(Component::Principal);
    }
    components
}

fn subject(install: &Install, component: Component) -> Subject {
    Subject {
        kind: "ServiceAccount".to_string(),
        name: install.resource_name(component),
        namespace: Some(install.namespace.clone()),
        ..Default::default()
    }
}

pub fn role(install: &Install, component: Component) -> Role {
    Role {
        metadata: metadata(install, install.resource_name(component), component),
        rules: Some(policy_rules(component)),
    }
}

pub fn role_binding(install: &Install, component: Component) -> RoleBinding {
    RoleBinding {
        metadata: metadata(install, install.resource_name(component), component),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name: install.resource_name(component),
        },
        subjects: Some(vec![subject(install, component)]),
    }
}

pub fn cluster_role(install: &Install, component: Component) -> ClusterRole {
    ClusterRole {
        metadata: cluster_metadata(install, install.cluster_resource_name(component), component),
        rules: Some(cluster_policy_rules(component)),
        ..Default::default()
    }
}

pub fn cluster_role_binding(install: &Install, component: Component) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: cluster_metadata(install, install.cluster_resource_name(component), component),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: install.cluster_resource_name(component),
        },
        subjects: Some(vec![subject(install, component)]),
    }
}

/// Name of the Role granted to `component` inside a managed namespace
pub fn managed_namespace_role_name(install: &Install, component: Component) -> String {
    install.cluster_resource_name(component)
}

fn managed_metadata(install: &Install, component: Component, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(managed_namespace_role_name(install, component)),
        namespace: Some(namespace.to_string()),
        labels: Some(labels(install, component)),
        ..Default::default()
    }
}

/// Role for `component` inside a namespace managed by the install
///
/// Owner references cannot cross namespaces, so these carry none and are
/// removed explicitly when the namespace stops being managed.
pub fn managed_namespace_role(install: &Install, component: Component, namespace: &str) -> Role {
    Role {
        metadata: managed_metadata(install, component, namespace),
        rules: Some(policy_rules(component)),
    }
}

pub fn managed_namespace_role_binding(
    install: &Install,
    component: Component,
    namespace: &str,
) -> RoleBinding {
    RoleBinding {
        metadata: managed_metadata(install, component, namespace),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name: managed_namespace_role_name(install, component),
        },
        subjects: Some(vec![subject(install, component)]),
    }
}
