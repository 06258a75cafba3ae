//! # Common Builders
//!
//! Labels, metadata and workload scaffolding shared by every component.

use super::Install;
use crate::constants::{
    LABEL_COMPONENT, LABEL_INSTANCE, LABEL_MANAGED_BY, LABEL_NAME, LABEL_PART_OF,
    MANAGED_BY_VALUE, PART_OF_VALUE,
};
use crate::crd::{LogFormat, LogLevel, ServiceType};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements,
    Service, ServiceAccount, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

/// Argo CD components managed by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    ApplicationController,
    Server,
    RepoServer,
    Redis,
    RedisHa,
    RedisHaProxy,
    Dex,
    Notifications,
    ApplicationSet,
    Principal,
    Agent,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::ApplicationController => "application-controller",
            Component::Server => "server",
            Component::RepoServer => "repo-server",
            Component::Redis => "redis",
            Component::RedisHa => "redis-ha",
            Component::RedisHaProxy => "redis-ha-haproxy",
            Component::Dex => "dex-server",
            Component::Notifications => "notifications-controller",
            Component::ApplicationSet => "applicationset-controller",
            Component::Principal => "agent-principal",
            Component::Agent => "agent-agent",
        }
    }
}

/// `image:tag`, or `image@sha256:...` for digests
pub fn image_ref(image: &str, version: &str) -> String {
    if version.starts_with("sha256:") {
        format!("{image}@{version}")
    } else {
        format!("{image}:{version}")
    }
}

/// Full label set for an object belonging to `component`
pub fn labels(install: &Install, component: Component) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), install.resource_name(component)),
        (LABEL_PART_OF.to_string(), PART_OF_VALUE.to_string()),
        (LABEL_COMPONENT.to_string(), component.as_str().to_string()),
        (LABEL_MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string()),
        (LABEL_INSTANCE.to_string(), install.name.clone()),
    ])
}

/// Labels used in pod selectors; must stay stable across upgrades
pub fn selector_labels(install: &Install, component: Component) -> BTreeMap<String, String> {
    BTreeMap::from([(LABEL_NAME.to_string(), install.resource_name(component))])
}

/// Metadata for a namespaced object in the install namespace
pub fn metadata(install: &Install, name: String, component: Component) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: Some(install.namespace.clone()),
        labels: Some(labels(install, component)),
        owner_references: Some(vec![install.owner.clone()]),
        ..Default::default()
    }
}

/// Metadata for a cluster-scoped object
///
/// Only a cluster-scoped owner may own a cluster-scoped object, so the owner
/// reference is set for `ClusterArgoCD` installs only. Finalizers clean up
/// the rest.
pub fn cluster_metadata(install: &Install, name: String, component: Component) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        labels: Some(labels(install, component)),
        owner_references: install
            .is_cluster_scoped()
            .then(|| vec![install.owner.clone()]),
        ..Default::default()
    }
}

pub fn service_account(install: &Install, component: Component) -> ServiceAccount {
    ServiceAccount {
        metadata: metadata(install, install.resource_name(component), component),
        ..Default::default()
    }
}

pub fn container_port(name: &str, port: i32) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_string()),
        container_port: port,
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

pub fn env_var(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        ..Default::default()
    }
}

/// Standard `--loglevel`/`--logformat` arguments
pub fn log_args(level: LogLevel, format: LogFormat) -> Vec<String> {
    vec![
        "--loglevel".to_string(),
        level.as_str().to_string(),
        "--logformat".to_string(),
        format.as_str().to_string(),
    ]
}

/// User-provided env vars override generated ones with the same name
pub fn merge_env(mut generated: Vec<EnvVar>, user: &[EnvVar]) -> Vec<EnvVar> {
    for var in user {
        if let Some(existing) = generated.iter_mut().find(|e| e.name == var.name) {
            *existing = var.clone();
        } else {
            generated.push(var.clone());
        }
    }
    generated
}

pub fn container(
    name: &str,
    image: String,
    args: Vec<String>,
    ports: Vec<ContainerPort>,
    env: Vec<EnvVar>,
    resources: Option<ResourceRequirements>,
) -> Container {
    Container {
        name: name.to_string(),
        image: Some(image),
        image_pull_policy: Some("IfNotPresent".to_string()),
        args: (!args.is_empty()).then_some(args),
        ports: (!ports.is_empty()).then_some(ports),
        env: (!env.is_empty()).then_some(env),
        resources,
        security_context: Some(k8s_openapi::api::core::v1::SecurityContext {
            allow_privilege_escalation: Some(false),
            capabilities: Some(k8s_openapi::api::core::v1::Capabilities {
                drop: Some(vec!["ALL".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Pod spec with the install's node placement applied
pub fn pod_spec(install: &Install, component: Component, containers: Vec<Container>) -> PodSpec {
    let placement = install.spec.node_placement.clone().unwrap_or_default();
    PodSpec {
        containers,
        service_account_name: Some(install.resource_name(component)),
        node_selector: (!placement.node_selector.is_empty()).then_some(placement.node_selector),
        tolerations: (!placement.tolerations.is_empty()).then_some(placement.tolerations),
        ..Default::default()
    }
}

pub fn pod_template(
    install: &Install,
    component: Component,
    annotations: BTreeMap<String, String>,
    spec: PodSpec,
) -> PodTemplateSpec {
    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(selector_labels(install, component)),
            annotations: (!annotations.is_empty()).then_some(annotations),
            ..Default::default()
        }),
        spec: Some(spec),
    }
}

pub fn deployment(
    install: &Install,
    component: Component,
    replicas: Option<i32>,
    template: PodTemplateSpec,
) -> Deployment {
    Deployment {
        metadata: metadata(install, install.resource_name(component), component),
        spec: Some(DeploymentSpec {
            replicas,
            selector: LabelSelector {
                match_labels: Some(selector_labels(install, component)),
                ..Default::default()
            },
            template,
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn service_port(name: &str, port: i32) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port,
        target_port: Some(IntOrString::Int(port)),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

pub fn service(
    install: &Install,
    component: Component,
    name: String,
    ports: Vec<ServicePort>,
    service_type: ServiceType,
) -> Service {
    Service {
        metadata: metadata(install, name, component),
        spec: Some(ServiceSpec {
            type_: Some(service_type.as_str().to_string()),
            selector: Some(selector_labels(install, component)),
            ports: Some(ports),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Metrics Service named `<instance>-<component>-metrics`
pub fn metrics_service(install: &Install, component: Component, port: i32) -> Service {
    service(
        install,
        component,
        format!("{}-metrics", install.resource_name(component)),
        vec![service_port("metrics", port)],
        ServiceType::ClusterIP,
    )
}

/// Pod annotations carrying a TLS checksum, if one is known
pub fn checksum_annotations(checksum: Option<&String>) -> BTreeMap<String, String> {
    checksum
        .map(|c| {
            BTreeMap::from([(
                crate::constants::TLS_CHECKSUM_ANNOTATION.to_string(),
                c.clone(),
            )])
        })
        .unwrap_or_default()
}

/// Ask the cluster to issue `secret` for this Service when `autotls` names
/// a known provider
pub fn with_auto_tls(mut svc: Service, autotls: Option<&str>, secret: &str) -> Service {
    if autotls == Some(crate::constants::AUTOTLS_OPENSHIFT) {
        svc.metadata.annotations.get_or_insert_with(BTreeMap::new).insert(
            crate::constants::SERVING_CERT_ANNOTATION.to_string(),
            secret.to_string(),
        );
    }
    svc
}
