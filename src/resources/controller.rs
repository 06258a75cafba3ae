//! # Application Controller
//!
//! StatefulSet and metrics Service for the Argo CD application controller.

use super::common::{
    checksum_annotations, container, container_port, env_var, log_args, merge_env, metadata, metrics_service, pod_spec,
    pod_template, selector_labels,
};
use super::{Component, Install};
use crate::constants::{ARGOCD_REDIS_TLS_SECRET, CONTROLLER_METRICS_PORT};
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

fn args(install: &Install) -> Vec<String> {
    let spec = &install.spec.controller;
    let mut args = vec![
        "/usr/local/bin/argocd-application-controller".to_string(),
        "--operation-processors".to_string(),
        spec.processors.operation.unwrap_or(10).to_string(),
        "--status-processors".to_string(),
        spec.processors.status.unwrap_or(20).to_string(),
        "--kubectl-parallelism-limit".to_string(),
        "10".to_string(),
        "--repo-server".to_string(),
        install.repo_server_address(),
        "--redis".to_string(),
        install.redis_address(),
    ];
    if let Some(sync) = &spec.app_sync {
        args.push("--app-resync".to_string());
        args.push(sync.clone());
    }
    args.extend(log_args(spec.log_level, spec.log_format));
    args
}

pub fn stateful_set(install: &Install) -> StatefulSet {
    let spec = &install.spec.controller;
    let replicas = spec.replicas();
    let component = Component::ApplicationController;

    let mut env = vec![env_var("ARGOCD_CONTROLLER_REPLICAS", replicas.to_string())];
    if spec.sharding.dynamic_scaling() {
        env.push(env_var("ARGOCD_ENABLE_DYNAMIC_CLUSTER_DISTRIBUTION", "true"));
        if let Some(per_shard) = spec.sharding.clusters_per_shard {
            env.push(env_var("ARGOCD_CONTROLLER_CLUSTERS_PER_SHARD", per_shard.to_string()));
        }
    }
    if install.is_cluster_scoped() {
        env.push(env_var("ARGOCD_CONTROLLER_NAMESPACED", "false"));
    }

    let container = container(
        "argocd-application-controller",
        install.argocd_image(),
        args(install),
        vec![container_port("metrics", CONTROLLER_METRICS_PORT)],
        merge_env(env, &spec.env),
        spec.resources.clone(),
    );

    let annotations = checksum_annotations(install.redis_tls_checksum.as_ref());
    let mut pod = pod_spec(install, component, vec![container]);
    pod.volumes = Some(vec![super::redis::tls_volume(ARGOCD_REDIS_TLS_SECRET)]);
    if let Some(c) = pod.containers.first_mut() {
        c.volume_mounts = Some(vec![super::redis::tls_volume_mount()]);
    }

    StatefulSet {
        metadata: metadata(install, install.resource_name(component), component),
        spec: Some(StatefulSetSpec {
            replicas: Some(replicas),
            service_name: install.resource_name(component).into(),
            selector: LabelSelector {
                match_labels: Some(selector_labels(install, component)),
                ..Default::default()
            },
            template: pod_template(install, component, annotations, pod),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn metrics(install: &Install) -> Service {
    metrics_service(install, Component::ApplicationController, CONTROLLER_METRICS_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ArgoCDSpec;
    use crate::resources::test_support::install;

    fn env_value(sts: &StatefulSet, name: &str) -> Option<String> {
        sts.spec.as_ref()?.template.spec.as_ref()?.containers[0]
            .env
            .as_ref()?
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.value.clone())
    }

    #[test]
    fn test_sharding_replicas_drive_statefulset() {
        let mut spec = ArgoCDSpec::default();
        spec.controller.sharding.enabled = true;
        spec.controller.sharding.replicas = Some(3);
        let sts = stateful_set(&install(spec));
        assert_eq!(sts.metadata.name.as_deref(), Some("example-application-controller"));
        assert_eq!(sts.spec.as_ref().unwrap().replicas, Some(3));
        assert_eq!(env_value(&sts, "ARGOCD_CONTROLLER_REPLICAS").as_deref(), Some("3"));
    }

    #[test]
    fn test_unsharded_controller_runs_single_replica() {
        let sts = stateful_set(&install(ArgoCDSpec::default()));
        assert_eq!(sts.spec.as_ref().unwrap().replicas, Some(1));
        assert_eq!(env_value(&sts, "ARGOCD_CONTROLLER_REPLICAS").as_deref(), Some("1"));
        assert!(env_value(&sts, "ARGOCD_ENABLE_DYNAMIC_CLUSTER_DISTRIBUTION").is_none());
    }

    #[test]
    fn test_redis_checksum_is_stamped_on_pods() {
        let mut install = install(ArgoCDSpec::default());
        install.redis_tls_checksum = Some("abc".into());
        let sts = stateful_set(&install);
        let annotations = sts.spec.unwrap().template.metadata.unwrap().annotations.unwrap();
        assert_eq!(annotations[crate::constants::TLS_CHECKSUM_ANNOTATION], "abc");
    }
}
