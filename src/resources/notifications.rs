//! # Notifications Controller

use super::common::{
    container, container_port, deployment, image_ref, log_args, merge_env, metrics_service,
    pod_spec, pod_template,
};
use super::configmaps::config_metadata;
use super::{Component, Install};
use crate::constants::{
    ARGOCD_NOTIFICATIONS_CM, ARGOCD_NOTIFICATIONS_SECRET, NOTIFICATIONS_METRICS_PORT,
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use std::collections::BTreeMap;

pub fn image(install: &Install) -> String {
    let n = &install.spec.notifications;
    match (&n.image, &n.version) {
        (None, None) => install.argocd_image(),
        (image, version) => image_ref(
            image.as_deref().unwrap_or(&install.images.argocd_image),
            version.as_deref().unwrap_or(&install.images.argocd_version),
        ),
    }
}

pub fn deployment_for(install: &Install) -> Deployment {
    let component = Component::Notifications;
    let n = &install.spec.notifications;
    let mut args = vec![
        "argocd-notifications".to_string(),
        "--argocd-repo-server".to_string(),
        install.repo_server_address(),
    ];
    args.extend(log_args(n.log_level, n.log_format));
    let c = container(
        "argocd-notifications-controller",
        image(install),
        args,
        vec![container_port("metrics", NOTIFICATIONS_METRICS_PORT)],
        merge_env(Vec::new(), &n.env),
        n.resources.clone(),
    );
    deployment(
        install,
        component,
        Some(n.replicas.unwrap_or(1)),
        pod_template(
            install,
            component,
            BTreeMap::new(),
            pod_spec(install, component, vec![c]),
        ),
    )
}

pub fn metrics(install: &Install) -> Service {
    metrics_service(install, Component::Notifications, NOTIFICATIONS_METRICS_PORT)
}

/// `argocd-notifications-cm`; triggers and templates are left to the user
pub fn config_map(install: &Install) -> ConfigMap {
    ConfigMap {
        metadata: config_metadata(install, ARGOCD_NOTIFICATIONS_CM),
        data: Some(BTreeMap::new()),
        ..Default::default()
    }
}

/// `argocd-notifications-secret`, created empty for service credentials
pub fn secret(install: &Install) -> Secret {
    Secret {
        metadata: config_metadata(install, ARGOCD_NOTIFICATIONS_SECRET),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}
