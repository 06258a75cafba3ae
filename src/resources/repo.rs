//! # Repo Server
//!
//! Deployment and Service for the Argo CD repository server.

use super::common::{
    checksum_annotations, container, container_port, deployment, log_args, merge_env,
    metrics_service, pod_spec, pod_template, service, service_port, with_auto_tls,
};
use super::{Component, Install};
use crate::constants::{
    ARGOCD_REPO_SERVER_TLS_SECRET, REPO_SERVER_METRICS_PORT, REPO_SERVER_PORT,
};
use crate::crd::ServiceType;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{SecretVolumeSource, Service, Volume, VolumeMount};

fn args(install: &Install) -> Vec<String> {
    let repo = &install.spec.repo;
    let mut args = vec![
        "uid_entrypoint.sh".to_string(),
        "argocd-repo-server".to_string(),
        "--redis".to_string(),
        install.redis_address(),
    ];
    args.extend(log_args(repo.log_level, repo.log_format));
    args
}

pub fn deployment_for(install: &Install) -> Deployment {
    let component = Component::RepoServer;
    let repo = &install.spec.repo;

    let mut env = Vec::new();
    if let Some(timeout) = repo.exec_timeout {
        env.push(super::common::env_var("ARGOCD_EXEC_TIMEOUT", format!("{timeout}s")));
    }
    let mut c = container(
        "argocd-repo-server",
        install.argocd_image(),
        args(install),
        vec![
            container_port("server", REPO_SERVER_PORT),
            container_port("metrics", REPO_SERVER_METRICS_PORT),
        ],
        merge_env(env, &repo.env),
        repo.resources.clone(),
    );
    c.volume_mounts = Some(vec![
        VolumeMount {
            name: "argocd-repo-server-tls".to_string(),
            mount_path: "/app/config/reposerver/tls".to_string(),
            ..Default::default()
        },
        super::redis::tls_volume_mount(),
    ]);

    let mut pod = pod_spec(install, component, vec![c]);
    pod.automount_service_account_token = Some(repo.mount_sa_token);
    if let Some(sa) = &repo.service_account {
        pod.service_account_name = Some(sa.clone());
    }
    pod.volumes = Some(vec![
        Volume {
            name: "argocd-repo-server-tls".to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(ARGOCD_REPO_SERVER_TLS_SECRET.to_string()),
                optional: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        },
        super::redis::tls_volume(crate::constants::ARGOCD_REDIS_TLS_SECRET),
    ]);

    let annotations = checksum_annotations(install.repo_tls_checksum.as_ref());
    deployment(
        install,
        component,
        Some(repo.replicas.unwrap_or(1)),
        pod_template(install, component, annotations, pod),
    )
}

pub fn service_for(install: &Install) -> Service {
    let svc = service(
        install,
        Component::RepoServer,
        install.resource_name(Component::RepoServer),
        vec![
            service_port("server", REPO_SERVER_PORT),
            service_port("metrics", REPO_SERVER_METRICS_PORT),
        ],
        ServiceType::ClusterIP,
    );
    with_auto_tls(svc, install.spec.repo.autotls.as_deref(), ARGOCD_REPO_SERVER_TLS_SECRET)
}

pub fn metrics(install: &Install) -> Service {
    metrics_service(install, Component::RepoServer, REPO_SERVER_METRICS_PORT)
}
