//! # Dex
//!
//! Deployment and Service for the dex SSO server.

use super::common::{
    container, container_port, deployment, image_ref, merge_env, pod_spec, pod_template, service,
    service_port,
};
use super::{Component, Install};
use crate::constants::{DEX_GRPC_PORT, DEX_HTTP_PORT};
use crate::crd::{ArgoCDDexSpec, ServiceType};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, EmptyDirVolumeSource, Service, Volume, VolumeMount};
use std::collections::BTreeMap;

fn dex_spec(install: &Install) -> ArgoCDDexSpec {
    install.spec.sso_spec().dex.unwrap_or_default()
}

pub fn image(install: &Install) -> String {
    let dex = dex_spec(install);
    image_ref(
        dex.image.as_deref().unwrap_or(&install.images.dex_image),
        dex.version.as_deref().unwrap_or(&install.images.dex_version),
    )
}

fn static_files_mount() -> VolumeMount {
    VolumeMount {
        name: "static-files".to_string(),
        mount_path: "/shared".to_string(),
        ..Default::default()
    }
}

pub fn deployment_for(install: &Install) -> Deployment {
    let component = Component::Dex;
    let dex = dex_spec(install);

    // argocd-dex reads argocd-cm and renders the real dex config at startup.
    let mut c = container(
        "dex",
        image(install),
        vec!["rundex".to_string()],
        vec![
            container_port("http", DEX_HTTP_PORT),
            container_port("grpc", DEX_GRPC_PORT),
        ],
        merge_env(Vec::new(), &dex.env),
        dex.resources.clone(),
    );
    c.command = Some(vec!["/shared/argocd-dex".to_string()]);
    c.volume_mounts = Some(vec![static_files_mount()]);

    let init = Container {
        name: "copyutil".to_string(),
        image: Some(install.argocd_image()),
        command: Some(vec![
            "cp".to_string(),
            "-n".to_string(),
            "/usr/local/bin/argocd".to_string(),
            "/shared/argocd-dex".to_string(),
        ]),
        volume_mounts: Some(vec![static_files_mount()]),
        ..Default::default()
    };

    let mut pod = pod_spec(install, component, vec![c]);
    pod.init_containers = Some(vec![init]);
    pod.volumes = Some(vec![Volume {
        name: "static-files".to_string(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Default::default()
    }]);
    deployment(
        install,
        component,
        Some(1),
        pod_template(install, component, BTreeMap::new(), pod),
    )
}

pub fn service_for(install: &Install) -> Service {
    service(
        install,
        Component::Dex,
        install.resource_name(Component::Dex),
        vec![
            service_port("http", DEX_HTTP_PORT),
            service_port("grpc", DEX_GRPC_PORT),
        ],
        ServiceType::ClusterIP,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ArgoCDSSOSpec, ArgoCDSpec, SSOProviderType};
    use crate::resources::test_support::install;

    #[test]
    fn test_dex_deployment_copies_argocd_binary() {
        let spec = ArgoCDSpec {
            sso: Some(ArgoCDSSOSpec {
                provider: Some(SSOProviderType::Dex),
                dex: Some(ArgoCDDexSpec {
                    version: Some("v2.40.0".into()),
                    ..Default::default()
                }),
                keycloak: None,
            }),
            ..Default::default()
        };
        let deploy = deployment_for(&install(spec));
        assert_eq!(deploy.metadata.name.as_deref(), Some("example-dex-server"));
        let pod = deploy.spec.unwrap().template.spec.unwrap();
        assert_eq!(
            pod.containers[0].image.as_deref(),
            Some("ghcr.io/dexidp/dex:v2.40.0")
        );
        assert_eq!(pod.init_containers.unwrap()[0].name, "copyutil");
    }
}
