//! # API Server
//!
//! Deployment, Services and external exposure (Ingress, OpenShift Route,
//! HorizontalPodAutoscaler) for the Argo CD API server.

use super::common::{
    container, container_port, deployment, labels, log_args, merge_env, metadata,
    metrics_service, pod_spec, pod_template, service, service_port,
};
use super::{Component, Install};
use crate::constants::{SERVER_HTTP_PORT, SERVER_METRICS_PORT};
use crate::crd::{IngressSpec, RouteSpec};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec,
    MetricSpec, MetricTarget, ResourceMetricSource,
};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec as K8sIngressSpec, IngressTLS, ServiceBackendPort,
};
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};

fn args(install: &Install) -> Vec<String> {
    let server = &install.spec.server;
    let mut args = vec![
        "argocd-server".to_string(),
        "--staticassets".to_string(),
        "/shared/app".to_string(),
        "--dex-server".to_string(),
        format!(
            "http://{}.{}.svc.cluster.local:{}",
            install.resource_name(Component::Dex),
            install.namespace,
            crate::constants::DEX_HTTP_PORT
        ),
        "--repo-server".to_string(),
        install.repo_server_address(),
        "--redis".to_string(),
        install.redis_address(),
    ];
    if server.insecure {
        args.push("--insecure".to_string());
    }
    args.extend(log_args(server.log_level, server.log_format));
    args
}

/// Host the API server is reachable at
pub fn host(install: &Install) -> String {
    install
        .spec
        .server
        .host
        .clone()
        .unwrap_or_else(|| install.server_service_host())
}

pub fn deployment_for(install: &Install) -> Deployment {
    let component = Component::Server;
    let server = &install.spec.server;
    let c = container(
        "argocd-server",
        install.argocd_image(),
        args(install),
        vec![
            container_port("http", SERVER_HTTP_PORT),
            container_port("metrics", SERVER_METRICS_PORT),
        ],
        merge_env(Vec::new(), &server.env),
        server.resources.clone(),
    );
    // The autoscaler owns replicas once enabled.
    let replicas = if server.autoscale.enabled {
        None
    } else {
        Some(server.replicas.unwrap_or(1))
    };
    deployment(
        install,
        component,
        replicas,
        pod_template(
            install,
            component,
            Default::default(),
            pod_spec(install, component, vec![c]),
        ),
    )
}

pub fn service_for(install: &Install) -> Service {
    service(
        install,
        Component::Server,
        install.resource_name(Component::Server),
        vec![service_port("http", 80), service_port("https", 443)]
            .into_iter()
            .map(|mut p| {
                p.target_port = Some(
                    k8s_openapi::apimachinery::pkg::util::intstr::IntOrString::Int(
                        SERVER_HTTP_PORT,
                    ),
                );
                p
            })
            .collect(),
        install.spec.server.service.service_type,
    )
}

pub fn metrics(install: &Install) -> Service {
    metrics_service(install, Component::Server, SERVER_METRICS_PORT)
}

/// Ingress routing `host` to `service_name:port`
pub fn ingress(
    install: &Install,
    component: Component,
    spec: &IngressSpec,
    host: &str,
    service_name: String,
    port: i32,
) -> Ingress {
    let mut meta = metadata(install, install.resource_name(component), component);
    if !spec.annotations.is_empty() {
        meta.annotations = Some(spec.annotations.clone());
    }
    Ingress {
        metadata: meta,
        spec: Some(K8sIngressSpec {
            ingress_class_name: spec.ingress_class_name.clone(),
            rules: Some(vec![IngressRule {
                host: Some(host.to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "ImplementationSpecific".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: service_name,
                                port: Some(ServiceBackendPort {
                                    number: Some(port),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            tls: spec.tls_secret_name.as_ref().map(|secret| {
                vec![IngressTLS {
                    hosts: Some(vec![host.to_string()]),
                    secret_name: Some(secret.clone()),
                }]
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn server_ingress(install: &Install) -> Ingress {
    ingress(
        install,
        Component::Server,
        &install.spec.server.ingress,
        &host(install),
        install.resource_name(Component::Server),
        if install.spec.server.insecure { 80 } else { 443 },
    )
}

/// `route.openshift.io/v1` Route, which has no typed binding
pub fn route_api_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk("route.openshift.io", "v1", "Route"))
}

/// OpenShift Route to `service_name` on `target_port`
pub fn route(
    install: &Install,
    component: Component,
    spec: &RouteSpec,
    host: Option<&str>,
    service_name: String,
    target_port: &str,
) -> DynamicObject {
    let mut obj = DynamicObject::new(&install.resource_name(component), &route_api_resource())
        .within(&install.namespace);
    obj.metadata.labels = Some(labels(install, component));
    obj.metadata.owner_references = Some(vec![install.owner.clone()]);
    if !spec.annotations.is_empty() {
        obj.metadata.annotations = Some(spec.annotations.clone());
    }
    let mut route_spec = serde_json::json!({
        "to": { "kind": "Service", "name": service_name, "weight": 100 },
        "port": { "targetPort": target_port },
        "tls": {
            "termination": spec.termination.as_str(),
            "insecureEdgeTerminationPolicy": "Redirect",
        },
        "wildcardPolicy": "None",
    });
    if let Some(host) = host {
        route_spec["host"] = serde_json::json!(host);
    }
    obj.data = serde_json::json!({ "spec": route_spec });
    obj
}

pub fn server_route(install: &Install) -> DynamicObject {
    let server = &install.spec.server;
    let port = if server.insecure { "http" } else { "https" };
    route(
        install,
        Component::Server,
        &server.route,
        server.host.as_deref(),
        install.resource_name(Component::Server),
        port,
    )
}

pub fn autoscaler(install: &Install) -> HorizontalPodAutoscaler {
    let autoscale = &install.spec.server.autoscale;
    HorizontalPodAutoscaler {
        metadata: metadata(
            install,
            install.resource_name(Component::Server),
            Component::Server,
        ),
        spec: Some(HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some("apps/v1".to_string()),
                kind: "Deployment".to_string(),
                name: install.resource_name(Component::Server),
            },
            min_replicas: Some(autoscale.min_replicas),
            max_replicas: autoscale.max_replicas,
            metrics: Some(vec![MetricSpec {
                type_: "Resource".to_string(),
                resource: Some(ResourceMetricSource {
                    name: "cpu".to_string(),
                    target: MetricTarget {
                        type_: "Utilization".to_string(),
                        average_utilization: Some(autoscale.target_cpu_utilization_percentage),
                        ..Default::default()
                    },
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ArgoCDSpec, ServiceType};
    use crate::resources::test_support::install;

    #[test]
    fn test_insecure_flag_is_passed_through() {
        let mut spec = ArgoCDSpec::default();
        spec.server.insecure = true;
        let deploy = deployment_for(&install(spec));
        let args = deploy.spec.unwrap().template.spec.unwrap().containers[0]
            .args
            .clone()
            .unwrap();
        assert!(args.contains(&"--insecure".to_string()));
    }

    #[test]
    fn test_autoscaler_owns_replicas() {
        let mut spec = ArgoCDSpec::default();
        spec.server.autoscale.enabled = true;
        spec.server.autoscale.max_replicas = 5;
        let install = install(spec);
        assert_eq!(deployment_for(&install).spec.unwrap().replicas, None);
        let hpa = autoscaler(&install);
        assert_eq!(hpa.spec.unwrap().max_replicas, 5);
    }

    #[test]
    fn test_service_type_follows_spec() {
        let mut spec = ArgoCDSpec::default();
        spec.server.service.service_type = ServiceType::LoadBalancer;
        let svc = service_for(&install(spec));
        assert_eq!(svc.spec.unwrap().type_.as_deref(), Some("LoadBalancer"));
    }

    #[test]
    fn test_ingress_uses_host_and_tls_secret() {
        let mut spec = ArgoCDSpec::default();
        spec.server.host = Some("argocd.example.com".into());
        spec.server.ingress.enabled = true;
        spec.server.ingress.tls_secret_name = Some("argocd-tls".into());
        let ing = server_ingress(&install(spec));
        let spec = ing.spec.unwrap();
        assert_eq!(
            spec.rules.unwrap()[0].host.as_deref(),
            Some("argocd.example.com")
        );
        assert_eq!(
            spec.tls.unwrap()[0].secret_name.as_deref(),
            Some("argocd-tls")
        );
    }

    #[test]
    fn test_route_is_a_dynamic_openshift_object() {
        let mut spec = ArgoCDSpec::default();
        spec.server.route.enabled = true;
        spec.server.host = Some("argocd.apps.example.com".into());
        let route = server_route(&install(spec));
        assert_eq!(route.types.as_ref().unwrap().kind, "Route");
        assert_eq!(route.data["spec"]["host"], "argocd.apps.example.com");
        assert_eq!(route.data["spec"]["tls"]["termination"], "passthrough");
        assert_eq!(route.data["spec"]["port"]["targetPort"], "https");
    }
}
