//! # Configuration ConfigMaps
//!
//! `argocd-cm`, `argocd-rbac-cm`, `argocd-ssh-known-hosts-cm`,
//! `argocd-tls-certs-cm`, `argocd-gpg-keys-cm` and `argocd-cmd-params-cm`.

use super::common::labels;
use super::{Component, Install};
use crate::constants::{
    ARGOCD_CM, ARGOCD_CMD_PARAMS_CM, ARGOCD_GPG_KEYS_CM, ARGOCD_RBAC_CM,
    ARGOCD_SSH_KNOWN_HOSTS_CM, ARGOCD_TLS_CERTS_CM, DEX_HTTP_PORT, LABEL_COMPONENT, LABEL_NAME,
};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

const DEFAULT_SSH_KNOWN_HOSTS: &str = "\
github.com ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnkVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl
gitlab.com ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIAfuCHKVTjquxvt6CM6tdG4SLp1Btn/nOeHHE5UOzRdf
";

const DEFAULT_RBAC_SCOPES: &str = "[groups]";

/// Metadata for a well-known Argo CD config object
///
/// Argo CD finds these by their fixed names, so `app.kubernetes.io/name`
/// carries the object name rather than `<instance>-<component>`.
pub fn config_metadata(install: &Install, name: &str) -> ObjectMeta {
    let mut labels = labels(install, Component::Server);
    labels.insert(LABEL_NAME.to_string(), name.to_string());
    labels.insert(LABEL_COMPONENT.to_string(), "config".to_string());
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(install.namespace.clone()),
        labels: Some(labels),
        owner_references: Some(vec![install.owner.clone()]),
        ..Default::default()
    }
}

fn config_map(install: &Install, name: &str, data: BTreeMap<String, String>) -> ConfigMap {
    ConfigMap {
        metadata: config_metadata(install, name),
        data: Some(data),
        ..Default::default()
    }
}

/// External URL of the API server
pub fn server_url(install: &Install) -> String {
    let host = install
        .spec
        .server
        .host
        .clone()
        .unwrap_or_else(|| install.server_service_host());
    format!("https://{host}")
}

/// Dex connector configuration for the OpenShift OAuth server
fn openshift_dex_config(install: &Install, groups: &[String]) -> String {
    let mut config = serde_json::json!({
        "issuer": "https://kubernetes.default.svc",
        "clientID": format!(
            "system:serviceaccount:{}:{}",
            install.namespace,
            install.resource_name(Component::Dex)
        ),
        "clientSecret": "$oidc.dex.clientSecret",
        "redirectURI": format!("{}/api/dex/callback", server_url(install)),
        "insecureCA": true,
    });
    if !groups.is_empty() {
        config["groups"] = serde_json::json!(groups);
    }
    let connectors = serde_json::json!({
        "connectors": [{
            "type": "openshift",
            "id": "openshift",
            "name": "OpenShift",
            "config": config,
        }]
    });
    serde_yaml::to_string(&connectors).unwrap_or_default()
}

pub fn argocd_cm(install: &Install) -> ConfigMap {
    let spec = &install.spec;
    let mut data = BTreeMap::new();
    data.insert("url".to_string(), server_url(install));
    data.insert("admin.enabled".to_string(), (!spec.disable_admin).to_string());
    data.insert(
        "application.instanceLabelKey".to_string(),
        "app.kubernetes.io/instance".to_string(),
    );
    data.insert(
        "statusbadge.enabled".to_string(),
        spec.status_badge_enabled.to_string(),
    );
    data.insert(
        "users.anonymous.enabled".to_string(),
        spec.users_anonymous_enabled.to_string(),
    );
    if let Some(exclusions) = &spec.resource_exclusions {
        data.insert("resource.exclusions".to_string(), exclusions.clone());
    }
    if let Some(inclusions) = &spec.resource_inclusions {
        data.insert("resource.inclusions".to_string(), inclusions.clone());
    }
    if let Some(options) = &spec.kustomize_build_options {
        data.insert("kustomize.buildOptions".to_string(), options.clone());
    }
    if let Some(banner) = &spec.banner {
        data.insert("ui.bannercontent".to_string(), banner.content.clone());
        if let Some(url) = &banner.url {
            data.insert("ui.bannerurl".to_string(), url.clone());
        }
    }

    let sso = spec.sso_spec();
    if sso.dex_enabled() {
        let dex = sso.dex.unwrap_or_default();
        let config = if dex.open_shift_oauth {
            Some(openshift_dex_config(install, &dex.groups))
        } else {
            dex.config
        };
        if let Some(config) = config {
            data.insert("dex.config".to_string(), config);
        }
    }

    for (key, value) in &spec.extra_config {
        data.insert(key.clone(), value.clone());
    }
    config_map(install, ARGOCD_CM, data)
}

pub fn rbac_cm(install: &Install) -> ConfigMap {
    let rbac = &install.spec.rbac;
    let mut data = BTreeMap::new();
    if let Some(policy) = &rbac.default_policy {
        data.insert("policy.default".to_string(), policy.clone());
    }
    if let Some(policy) = &rbac.policy {
        data.insert("policy.csv".to_string(), policy.clone());
    }
    if let Some(mode) = &rbac.policy_matcher_mode {
        data.insert("policy.matchMode".to_string(), mode.clone());
    }
    data.insert(
        "scopes".to_string(),
        rbac.scopes.clone().unwrap_or_else(|| DEFAULT_RBAC_SCOPES.to_string()),
    );
    config_map(install, ARGOCD_RBAC_CM, data)
}

pub fn ssh_known_hosts_cm(install: &Install) -> ConfigMap {
    let hosts = &install.spec.initial_ssh_known_hosts;
    let mut known_hosts = String::new();
    if !hosts.exclude_default_hosts {
        known_hosts.push_str(DEFAULT_SSH_KNOWN_HOSTS);
    }
    if let Some(keys) = &hosts.keys {
        known_hosts.push_str(keys);
        if !keys.ends_with('\n') {
            known_hosts.push('\n');
        }
    }
    config_map(
        install,
        ARGOCD_SSH_KNOWN_HOSTS_CM,
        BTreeMap::from([("ssh_known_hosts".to_string(), known_hosts)]),
    )
}

pub fn tls_certs_cm(install: &Install) -> ConfigMap {
    config_map(
        install,
        ARGOCD_TLS_CERTS_CM,
        install.spec.tls.initial_certs.clone(),
    )
}

pub fn gpg_keys_cm(install: &Install) -> ConfigMap {
    config_map(install, ARGOCD_GPG_KEYS_CM, install.spec.gpg_keys.clone())
}

/// Command parameters read by every Argo CD binary at startup
pub fn cmd_params_cm(install: &Install) -> ConfigMap {
    let spec = &install.spec;
    let mut data = BTreeMap::new();
    data.insert("redis.server".to_string(), install.redis_address());
    data.insert("repo.server".to_string(), install.repo_server_address());
    data.insert("server.insecure".to_string(), spec.server.insecure.to_string());
    data.insert(
        "controller.log.level".to_string(),
        spec.controller.log_level.as_str().to_string(),
    );
    data.insert(
        "controller.log.format".to_string(),
        spec.controller.log_format.as_str().to_string(),
    );
    if let Some(n) = spec.controller.processors.status {
        data.insert("controller.status.processors".to_string(), n.to_string());
    }
    if let Some(n) = spec.controller.processors.operation {
        data.insert("controller.operation.processors".to_string(), n.to_string());
    }
    data.insert(
        "server.log.level".to_string(),
        spec.server.log_level.as_str().to_string(),
    );
    data.insert(
        "reposerver.log.level".to_string(),
        spec.repo.log_level.as_str().to_string(),
    );
    if spec.repo.verify_tls {
        data.insert("server.repo.server.strict.tls".to_string(), "true".to_string());
        data.insert("controller.repo.server.strict.tls".to_string(), "true".to_string());
    }
    if spec.redis.disable_tls_verification {
        data.insert("redis.insecure.skip.verify".to_string(), "true".to_string());
    }
    if !spec.source_namespaces.is_empty() {
        data.insert(
            "application.namespaces".to_string(),
            spec.source_namespaces.join(","),
        );
    }
    if let Some(appset) = &spec.application_set {
        if !appset.source_namespaces.is_empty() {
            data.insert(
                "applicationsetcontroller.namespaces".to_string(),
                appset.source_namespaces.join(","),
            );
        }
    }
    if spec.sso_spec().dex_enabled() {
        data.insert(
            "server.dex.server".to_string(),
            format!(
                "http://{}.{}.svc.cluster.local:{}",
                install.resource_name(Component::Dex),
                install.namespace,
                DEX_HTTP_PORT
            ),
        );
    }
    config_map(install, ARGOCD_CMD_PARAMS_CM, data)
}

/// Every configuration ConfigMap for an install
pub fn all(install: &Install) -> Vec<ConfigMap> {
    vec![
        argocd_cm(install),
        rbac_cm(install),
        ssh_known_hosts_cm(install),
        tls_certs_cm(install),
        gpg_keys_cm(install),
        cmd_params_cm(install),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ArgoCDDexSpec, ArgoCDSSOSpec, ArgoCDSpec, SSOProviderType};
    use crate::resources::test_support::install;

    #[test]
    fn test_extra_config_is_merged_last() {
        let mut spec = ArgoCDSpec::default();
        spec.disable_admin = true;
        spec.extra_config
            .insert("admin.enabled".to_string(), "true".to_string());
        spec.extra_config
            .insert("timeout.reconciliation".to_string(), "300s".to_string());
        let cm = argocd_cm(&install(spec));
        let data = cm.data.unwrap();
        assert_eq!(data["admin.enabled"], "true");
        assert_eq!(data["timeout.reconciliation"], "300s");
    }

    #[test]
    fn test_disable_admin_turns_off_admin_account() {
        let spec = ArgoCDSpec {
            disable_admin: true,
            ..Default::default()
        };
        let data = argocd_cm(&install(spec)).data.unwrap();
        assert_eq!(data["admin.enabled"], "false");
        assert_eq!(data["url"], "https://example-server.argocd.svc.cluster.local");
    }

    #[test]
    fn test_openshift_oauth_generates_dex_connector() {
        let spec = ArgoCDSpec {
            sso: Some(ArgoCDSSOSpec {
                provider: Some(SSOProviderType::Dex),
                dex: Some(ArgoCDDexSpec {
                    open_shift_oauth: true,
                    groups: vec!["admins".to_string()],
                    ..Default::default()
                }),
                keycloak: None,
            }),
            ..Default::default()
        };
        let data = argocd_cm(&install(spec)).data.unwrap();
        let dex: serde_yaml::Value = serde_yaml::from_str(&data["dex.config"]).unwrap();
        assert_eq!(dex["connectors"][0]["type"], "openshift");
        assert_eq!(
            dex["connectors"][0]["config"]["clientID"],
            "system:serviceaccount:argocd:example-dex-server"
        );
        assert_eq!(dex["connectors"][0]["config"]["groups"][0], "admins");
    }

    #[test]
    fn test_rbac_cm_defaults_scopes() {
        let data = rbac_cm(&install(ArgoCDSpec::default())).data.unwrap();
        assert_eq!(data["scopes"], "[groups]");
        assert!(!data.contains_key("policy.csv"));
    }

    #[test]
    fn test_known_hosts_can_exclude_defaults() {
        let mut spec = ArgoCDSpec::default();
        spec.initial_ssh_known_hosts.exclude_default_hosts = true;
        spec.initial_ssh_known_hosts.keys = Some("git.example.com ssh-ed25519 AAAA".into());
        let data = ssh_known_hosts_cm(&install(spec)).data.unwrap();
        assert_eq!(data["ssh_known_hosts"], "git.example.com ssh-ed25519 AAAA\n");
    }

    #[test]
    fn test_cmd_params_lists_source_namespaces() {
        let spec = ArgoCDSpec {
            source_namespaces: vec!["team-a".into(), "team-b".into()],
            ..Default::default()
        };
        let data = cmd_params_cm(&install(spec)).data.unwrap();
        assert_eq!(data["application.namespaces"], "team-a,team-b");
        assert_eq!(
            data["repo.server"],
            "example-repo-server.argocd.svc.cluster.local:8081"
        );
    }
}
