//! # Redis
//!
//! Single redis Deployment, or in HA mode a redis StatefulSet fronted by
//! HAProxy that always routes to the current master.

use super::common::{
    checksum_annotations, container, container_port, deployment, image_ref, metadata, pod_spec,
    pod_template, selector_labels, service, service_port, with_auto_tls,
};
use super::{Component, Install};
use crate::constants::{ARGOCD_REDIS_TLS_SECRET, REDIS_HA_REPLICAS, REDIS_PORT};
use crate::crd::ServiceType;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, SecretVolumeSource, Service, ServiceSpec, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::collections::BTreeMap;

const TLS_MOUNT_PATH: &str = "/app/config/redis/tls";
const TLS_VOLUME: &str = "redis-tls";

/// Optional secret volume holding the redis TLS pair
pub fn tls_volume(secret_name: &str) -> Volume {
    Volume {
        name: TLS_VOLUME.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret_name.to_string()),
            optional: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn tls_volume_mount() -> VolumeMount {
    VolumeMount {
        name: TLS_VOLUME.to_string(),
        mount_path: TLS_MOUNT_PATH.to_string(),
        read_only: Some(true),
        ..Default::default()
    }
}

pub fn image(install: &Install) -> String {
    let redis = &install.spec.redis;
    image_ref(
        redis.image.as_deref().unwrap_or(&install.images.redis_image),
        redis.version.as_deref().unwrap_or(&install.images.redis_version),
    )
}

fn haproxy_image(install: &Install) -> String {
    let ha = &install.spec.ha;
    image_ref(
        ha.redis_proxy_image.as_deref().unwrap_or(&install.images.haproxy_image),
        ha.redis_proxy_version
            .as_deref()
            .unwrap_or(&install.images.haproxy_version),
    )
}

/// redis-server arguments; TLS is switched on once the TLS secret is known
fn server_args(install: &Install) -> Vec<String> {
    let mut args = vec![
        "--save".to_string(),
        String::new(),
        "--appendonly".to_string(),
        "no".to_string(),
    ];
    if install.redis_tls_checksum.is_some() {
        args.extend(
            [
                "--tls-port",
                "6379",
                "--port",
                "0",
                "--tls-cert-file",
                "/app/config/redis/tls/tls.crt",
                "--tls-key-file",
                "/app/config/redis/tls/tls.key",
                "--tls-auth-clients",
                "no",
            ]
            .map(String::from),
        );
    }
    args
}

pub fn deployment_for(install: &Install) -> Deployment {
    let component = Component::Redis;
    let mut c = container(
        "redis",
        image(install),
        server_args(install),
        vec![container_port("redis", REDIS_PORT)],
        Vec::new(),
        install.spec.redis.resources.clone(),
    );
    c.volume_mounts = Some(vec![tls_volume_mount()]);
    let mut pod = pod_spec(install, component, vec![c]);
    pod.volumes = Some(vec![tls_volume(ARGOCD_REDIS_TLS_SECRET)]);
    let annotations = checksum_annotations(install.redis_tls_checksum.as_ref());
    deployment(
        install,
        component,
        Some(1),
        pod_template(install, component, annotations, pod),
    )
}

pub fn service_for(install: &Install) -> Service {
    let svc = service(
        install,
        Component::Redis,
        install.resource_name(Component::Redis),
        vec![service_port("tcp-redis", REDIS_PORT)],
        ServiceType::ClusterIP,
    );
    with_auto_tls(svc, install.spec.redis.autotls.as_deref(), ARGOCD_REDIS_TLS_SECRET)
}

/// Headless service giving each HA pod a stable DNS name
pub fn ha_headless_service(install: &Install) -> Service {
    let mut svc = service(
        install,
        Component::RedisHa,
        install.resource_name(Component::RedisHa),
        vec![service_port("tcp-redis", REDIS_PORT)],
        ServiceType::ClusterIP,
    );
    if let Some(spec) = svc.spec.as_mut() {
        spec.cluster_ip = Some("None".to_string());
    }
    svc
}

fn ha_server_name(install: &Install) -> String {
    format!("{}-server", install.resource_name(Component::RedisHa))
}

fn ha_pod_host(install: &Install, ordinal: i32) -> String {
    format!(
        "{}-{}.{}.{}.svc.cluster.local",
        ha_server_name(install),
        ordinal,
        install.resource_name(Component::RedisHa),
        install.namespace
    )
}

/// Redis StatefulSet `<instance>-redis-ha-server`; pod 0 starts as master
pub fn ha_stateful_set(install: &Install) -> StatefulSet {
    let component = Component::RedisHa;
    let args = server_args(install)
        .iter()
        .map(|a| if a.is_empty() { "''".to_string() } else { a.clone() })
        .collect::<Vec<_>>()
        .join(" ");
    let script = format!(
        "if [ \"${{HOSTNAME##*-}}\" = \"0\" ]; then exec redis-server {args}; \
         else exec redis-server {args} --replicaof {} {REDIS_PORT}; fi",
        ha_pod_host(install, 0)
    );
    let mut c = container(
        "redis",
        image(install),
        vec!["-c".to_string(), script],
        vec![container_port("redis", REDIS_PORT)],
        Vec::new(),
        install.spec.ha.resources.clone(),
    );
    c.command = Some(vec!["sh".to_string()]);
    c.volume_mounts = Some(vec![tls_volume_mount()]);
    let mut pod = pod_spec(install, component, vec![c]);
    pod.volumes = Some(vec![tls_volume(ARGOCD_REDIS_TLS_SECRET)]);
    pod.service_account_name = Some(install.resource_name(Component::Redis));

    StatefulSet {
        metadata: metadata(install, ha_server_name(install), component),
        spec: Some(StatefulSetSpec {
            replicas: Some(REDIS_HA_REPLICAS),
            service_name: install.resource_name(component).into(),
            selector: LabelSelector {
                match_labels: Some(selector_labels(install, component)),
                ..Default::default()
            },
            template: pod_template(
                install,
                component,
                checksum_annotations(install.redis_tls_checksum.as_ref()),
                pod,
            ),
            pod_management_policy: Some("OrderedReady".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// haproxy.cfg routing to whichever redis answers `role:master`
pub fn haproxy_config(install: &Install) -> ConfigMap {
    let mut cfg = String::from(
        "defaults\n  mode tcp\n  timeout connect 4s\n  timeout server 330s\n  timeout client 330s\n  timeout check 2s\n\n\
         frontend redis\n  bind :6379\n  default_backend redis_master\n\n\
         backend redis_master\n  option tcp-check\n  tcp-check send PING\\r\\n\n  tcp-check expect string +PONG\n  \
         tcp-check send info\\ replication\\r\\n\n  tcp-check expect string role:master\n  tcp-check send QUIT\\r\\n\n  \
         tcp-check expect string +OK\n",
    );
    for ordinal in 0..REDIS_HA_REPLICAS {
        cfg.push_str(&format!(
            "  server R{ordinal} {}:{REDIS_PORT} check inter 1s\n",
            ha_pod_host(install, ordinal)
        ));
    }
    ConfigMap {
        metadata: metadata(
            install,
            install.resource_name(Component::RedisHaProxy),
            Component::RedisHaProxy,
        ),
        data: Some(BTreeMap::from([("haproxy.cfg".to_string(), cfg)])),
        ..Default::default()
    }
}

pub fn haproxy_deployment(install: &Install) -> Deployment {
    let component = Component::RedisHaProxy;
    let mut c = container(
        "haproxy",
        haproxy_image(install),
        vec!["-f".to_string(), "/usr/local/etc/haproxy/haproxy.cfg".to_string()],
        vec![container_port("redis", REDIS_PORT)],
        Vec::new(),
        install.spec.ha.resources.clone(),
    );
    c.command = Some(vec!["haproxy".to_string()]);
    c.volume_mounts = Some(vec![VolumeMount {
        name: "config".to_string(),
        mount_path: "/usr/local/etc/haproxy".to_string(),
        read_only: Some(true),
        ..Default::default()
    }]);
    let mut pod = pod_spec(install, component, vec![c]);
    pod.service_account_name = Some(install.resource_name(Component::Redis));
    pod.volumes = Some(vec![Volume {
        name: "config".to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: install.resource_name(component).into(),
            ..Default::default()
        }),
        ..Default::default()
    }]);
    deployment(
        install,
        component,
        Some(REDIS_HA_REPLICAS),
        pod_template(install, component, BTreeMap::new(), pod),
    )
}

pub fn haproxy_service(install: &Install) -> Service {
    let mut svc = service(
        install,
        Component::RedisHaProxy,
        install.resource_name(Component::RedisHaProxy),
        vec![service_port("tcp-redis", REDIS_PORT)],
        ServiceType::ClusterIP,
    );
    svc.spec.get_or_insert_with(ServiceSpec::default).session_affinity = Some("None".to_string());
    // In HA mode clients reach redis through HAProxy, which terminates TLS
    with_auto_tls(svc, install.spec.redis.autotls.as_deref(), ARGOCD_REDIS_TLS_SECRET)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ArgoCDSpec;
    use crate::resources::test_support::install;

    #[test]
    fn test_ha_statefulset_runs_three_servers() {
        let mut spec = ArgoCDSpec::default();
        spec.ha.enabled = true;
        let sts = ha_stateful_set(&install(spec));
        assert_eq!(sts.metadata.name.as_deref(), Some("example-redis-ha-server"));
        assert_eq!(sts.spec.unwrap().replicas, Some(3));
    }

    #[test]
    fn test_haproxy_config_lists_every_server() {
        let cm = haproxy_config(&install(ArgoCDSpec::default()));
        let cfg = &cm.data.unwrap()["haproxy.cfg"];
        assert!(cfg.contains("server R0 example-redis-ha-server-0.example-redis-ha.argocd.svc.cluster.local:6379"));
        assert!(cfg.contains("server R2 "));
        assert!(cfg.contains("role:master"));
    }

    #[test]
    fn test_tls_args_only_when_secret_known() {
        let mut install = install(ArgoCDSpec::default());
        assert!(!server_args(&install).contains(&"--tls-port".to_string()));
        install.redis_tls_checksum = Some("sum".into());
        assert!(server_args(&install).contains(&"--tls-port".to_string()));
    }

    #[test]
    fn test_openshift_autotls_annotates_client_facing_service() {
        use crate::constants::SERVING_CERT_ANNOTATION;

        let mut spec = ArgoCDSpec::default();
        spec.redis.autotls = Some("openshift".into());
        let tls = install(spec);
        for svc in [service_for(&tls), haproxy_service(&tls)] {
            assert_eq!(
                svc.metadata.annotations.unwrap()[SERVING_CERT_ANNOTATION],
                ARGOCD_REDIS_TLS_SECRET
            );
        }
        assert!(ha_headless_service(&tls).metadata.annotations.is_none());

        let mut spec = ArgoCDSpec::default();
        spec.redis.autotls = Some("cert-manager".into());
        assert!(service_for(&install(spec)).metadata.annotations.is_none());
    }

    #[test]
    fn test_redis_image_override() {
        let mut spec = ArgoCDSpec::default();
        spec.redis.image = Some("registry.local/redis".into());
        spec.redis.version = Some("7.2".into());
        assert_eq!(image(&install(spec)), "registry.local/redis:7.2");
    }
}
