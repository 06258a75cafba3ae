//! # ApplicationSet Controller

use super::common::{
    container, container_port, deployment, image_ref, log_args, merge_env, pod_spec, pod_template,
    service, service_port,
};
use super::{Component, Install};
use crate::constants::{APPSET_METRICS_PORT, APPSET_WEBHOOK_PORT};
use crate::crd::{ArgoCDApplicationSetSpec, ServiceType};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::DynamicObject;
use std::collections::BTreeMap;

fn appset_spec(install: &Install) -> ArgoCDApplicationSetSpec {
    install.spec.application_set.clone().unwrap_or_default()
}

pub fn image(install: &Install) -> String {
    let appset = appset_spec(install);
    match (&appset.image, &appset.version) {
        (None, None) => install.argocd_image(),
        (image, version) => image_ref(
            image.as_deref().unwrap_or(&install.images.argocd_image),
            version.as_deref().unwrap_or(&install.images.argocd_version),
        ),
    }
}

fn args(install: &Install, appset: &ArgoCDApplicationSetSpec) -> Vec<String> {
    let mut args = vec![
        "/usr/local/bin/argocd-applicationset-controller".to_string(),
        "--argocd-repo-server".to_string(),
        install.repo_server_address(),
    ];
    if !appset.source_namespaces.is_empty() {
        args.push("--applicationset-namespaces".to_string());
        args.push(appset.source_namespaces.join(","));
    }
    if !appset.scm_providers.is_empty() {
        args.push("--allowed-scm-providers".to_string());
        args.push(appset.scm_providers.join(","));
        args.push("--enable-scm-providers".to_string());
    }
    args.extend(log_args(appset.log_level, appset.log_format));
    args
}

pub fn deployment_for(install: &Install) -> Deployment {
    let component = Component::ApplicationSet;
    let appset = appset_spec(install);
    let c = container(
        "argocd-applicationset-controller",
        image(install),
        args(install, &appset),
        vec![
            container_port("webhook", APPSET_WEBHOOK_PORT),
            container_port("metrics", APPSET_METRICS_PORT),
        ],
        merge_env(Vec::new(), &appset.env),
        appset.resources.clone(),
    );
    deployment(
        install,
        component,
        Some(1),
        pod_template(
            install,
            component,
            BTreeMap::new(),
            pod_spec(install, component, vec![c]),
        ),
    )
}

/// Webhook Service receiving SCM events
pub fn webhook_service(install: &Install) -> Service {
    service(
        install,
        Component::ApplicationSet,
        install.resource_name(Component::ApplicationSet),
        vec![
            service_port("webhook", APPSET_WEBHOOK_PORT),
            service_port("metrics", APPSET_METRICS_PORT),
        ],
        ServiceType::ClusterIP,
    )
}

fn webhook_host(install: &Install) -> String {
    appset_spec(install)
        .webhook_server
        .host
        .unwrap_or_else(|| format!("{}-appset-webhook", super::server::host(install)))
}

pub fn webhook_ingress(install: &Install) -> Ingress {
    let appset = appset_spec(install);
    super::server::ingress(
        install,
        Component::ApplicationSet,
        &appset.webhook_server.ingress,
        &webhook_host(install),
        install.resource_name(Component::ApplicationSet),
        APPSET_WEBHOOK_PORT,
    )
}

pub fn webhook_route(install: &Install) -> DynamicObject {
    let appset = appset_spec(install);
    super::server::route(
        install,
        Component::ApplicationSet,
        &appset.webhook_server.route,
        appset.webhook_server.host.as_deref(),
        install.resource_name(Component::ApplicationSet),
        "webhook",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ArgoCDSpec;
    use crate::resources::test_support::install;

    #[test]
    fn test_scm_providers_enable_flag() {
        let spec = ArgoCDSpec {
            application_set: Some(ArgoCDApplicationSetSpec {
                scm_providers: vec!["https://git.example.com".into()],
                source_namespaces: vec!["team-*".into()],
                ..Default::default()
            }),
            ..Default::default()
        };
        let install = install(spec);
        let args = args(&install, &appset_spec(&install));
        assert!(args.contains(&"--enable-scm-providers".to_string()));
        assert!(args.contains(&"team-*".to_string()));
    }

    #[test]
    fn test_webhook_service_exposes_webhook_port() {
        let svc = webhook_service(&install(ArgoCDSpec::default()));
        let ports = svc.spec.unwrap().ports.unwrap();
        assert_eq!(ports[0].port, 7000);
    }
}
