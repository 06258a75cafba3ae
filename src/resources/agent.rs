//! # Argo CD Agent
//!
//! Principal (hub side) and agent (spoke side) workloads. Both read their
//! settings from a params ConfigMap through env vars.

use super::common::{
    container, container_port, deployment, image_ref, metadata, pod_spec, pod_template, service,
    service_port,
};
use super::{Component, Install};
use crate::constants::{AGENT_METRICS_PORT, PRINCIPAL_GRPC_PORT};
use crate::crd::{AgentSpec, PrincipalSpec};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapKeySelector, EnvVar, EnvVarSource, Service,
};
use std::collections::BTreeMap;

fn params_name(install: &Install, component: Component) -> String {
    format!("{}-params", install.resource_name(component))
}

/// `principal.listen.port` -> `ARGOCD_PRINCIPAL_LISTEN_PORT`
fn env_name(key: &str) -> String {
    format!(
        "ARGOCD_{}",
        key.replace(['.', '-'], "_").to_ascii_uppercase()
    )
}

/// One env var per params key, resolved from the params ConfigMap
fn params_env(config_map: &str, params: &BTreeMap<String, String>) -> Vec<EnvVar> {
    params
        .keys()
        .map(|key| EnvVar {
            name: env_name(key),
            value_from: Some(EnvVarSource {
                config_map_key_ref: Some(ConfigMapKeySelector {
                    name: config_map.to_string().into(),
                    key: key.clone(),
                    optional: Some(true),
                }),
                ..Default::default()
            }),
            ..Default::default()
        })
        .collect()
}

fn agent_image(install: &Install, image: Option<&String>) -> String {
    match image {
        Some(image) if image.contains(':') || image.contains('@') => image.clone(),
        Some(image) => image_ref(image, &install.images.agent_version),
        None => image_ref(&install.images.agent_image, &install.images.agent_version),
    }
}

pub fn principal_spec(install: &Install) -> PrincipalSpec {
    install.spec.agent_spec().principal.unwrap_or_default()
}

pub fn agent_spec(install: &Install) -> AgentSpec {
    install.spec.agent_spec().agent.unwrap_or_default()
}

pub fn principal_params(install: &Install) -> BTreeMap<String, String> {
    let p = principal_spec(install);
    let mut params = BTreeMap::new();
    let mut put = |k: &str, v: String| {
        params.insert(k.to_string(), v);
    };
    put("principal.listen.port", PRINCIPAL_GRPC_PORT.to_string());
    put("principal.log.level", p.log_level.as_str().to_string());
    put("principal.log.format", p.log_format.as_str().to_string());
    put("principal.namespace", install.namespace.clone());
    put(
        "principal.allowed-namespaces",
        p.namespace.allowed_namespaces.join(","),
    );
    put(
        "principal.namespace-create.enable",
        p.namespace.enable_namespace_create.to_string(),
    );
    put("principal.auth", p.auth.clone().unwrap_or_else(|| "mtls:CN=([^,]+)".to_string()));
    put(
        "principal.tls.secret-name",
        p.tls
            .secret_name
            .clone()
            .unwrap_or_else(|| "argocd-agent-principal-tls".to_string()),
    );
    put(
        "principal.tls.server.root-ca-secret-name",
        p.tls
            .root_ca_secret_name
            .clone()
            .unwrap_or_else(|| "argocd-agent-ca".to_string()),
    );
    put(
        "principal.tls.server.allow-generate",
        p.tls.insecure_generate.to_string(),
    );
    put(
        "principal.jwt.secret-name",
        p.jwt
            .secret_name
            .clone()
            .unwrap_or_else(|| "argocd-agent-jwt".to_string()),
    );
    put("principal.jwt.allow-generate", p.jwt.insecure_generate.to_string());
    if let Some(interval) = &p.server.keep_alive_min_interval {
        put("principal.keep-alive-min-interval", interval.clone());
    }
    put("principal.redis-server-address", install.redis_address());
    params
}

pub fn agent_params(install: &Install) -> BTreeMap<String, String> {
    let a = agent_spec(install);
    let mut params = BTreeMap::new();
    let mut put = |k: &str, v: String| {
        params.insert(k.to_string(), v);
    };
    put("agent.mode", a.client.mode.as_str().to_string());
    put("agent.log.level", a.log_level.as_str().to_string());
    put("agent.log.format", a.log_format.as_str().to_string());
    put("agent.namespace", install.namespace.clone());
    put(
        "agent.creds",
        a.client.creds.clone().unwrap_or_else(|| "mtls:any".to_string()),
    );
    if let Some(address) = &a.client.principal_server_address {
        put("agent.server.address", address.clone());
    }
    put(
        "agent.server.port",
        a.client
            .principal_server_port
            .unwrap_or(PRINCIPAL_GRPC_PORT)
            .to_string(),
    );
    put("agent.tls.client.insecure", a.tls.insecure.to_string());
    put(
        "agent.tls.secret-name",
        a.tls
            .secret_name
            .clone()
            .unwrap_or_else(|| "argocd-agent-client-tls".to_string()),
    );
    put(
        "agent.tls.root-ca-secret-name",
        a.tls
            .root_ca_secret_name
            .clone()
            .unwrap_or_else(|| "argocd-agent-ca".to_string()),
    );
    put("agent.redis.address", install.redis_address());
    params
}

fn params_config_map(
    install: &Install,
    component: Component,
    params: BTreeMap<String, String>,
) -> ConfigMap {
    ConfigMap {
        metadata: metadata(install, params_name(install, component), component),
        data: Some(params),
        ..Default::default()
    }
}

pub fn principal_config_map(install: &Install) -> ConfigMap {
    params_config_map(install, Component::Principal, principal_params(install))
}

pub fn agent_config_map(install: &Install) -> ConfigMap {
    params_config_map(install, Component::Agent, agent_params(install))
}

pub fn principal_deployment(install: &Install) -> Deployment {
    let component = Component::Principal;
    let p = principal_spec(install);
    let env = params_env(&params_name(install, component), &principal_params(install));
    let c = container(
        "argocd-agent-principal",
        agent_image(install, p.image.as_ref()),
        vec!["principal".to_string()],
        vec![container_port("grpc", PRINCIPAL_GRPC_PORT)],
        env,
        None,
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

pub fn principal_service(install: &Install) -> Service {
    service(
        install,
        Component::Principal,
        install.resource_name(Component::Principal),
        vec![service_port("grpc", PRINCIPAL_GRPC_PORT)],
        principal_spec(install).server.service.service_type,
    )
}

pub fn agent_deployment(install: &Install) -> Deployment {
    let component = Component::Agent;
    let a = agent_spec(install);
    let env = params_env(&params_name(install, component), &agent_params(install));
    let c = container(
        "argocd-agent-agent",
        agent_image(install, a.image.as_ref()),
        vec!["agent".to_string()],
        vec![container_port("metrics", AGENT_METRICS_PORT)],
        env,
        None,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{AgentMode, ArgoCDAgentSpec, ArgoCDSpec};
    use crate::resources::test_support::install;

    #[test]
    fn test_env_name_from_param_key() {
        assert_eq!(env_name("principal.listen.port"), "ARGOCD_PRINCIPAL_LISTEN_PORT");
        assert_eq!(
            env_name("principal.namespace-create.enable"),
            "ARGOCD_PRINCIPAL_NAMESPACE_CREATE_ENABLE"
        );
    }

    #[test]
    fn test_agent_params_follow_client_settings() {
        let mut agent = AgentSpec::default();
        agent.enabled = true;
        agent.client.mode = AgentMode::Autonomous;
        agent.client.principal_server_address = Some("principal.example.com".into());
        let spec = ArgoCDSpec {
            argocd_agent: Some(ArgoCDAgentSpec {
                principal: None,
                agent: Some(agent),
            }),
            ..Default::default()
        };
        let params = agent_params(&install(spec));
        assert_eq!(params["agent.mode"], "autonomous");
        assert_eq!(params["agent.server.address"], "principal.example.com");
        assert_eq!(params["agent.server.port"], "8443");
    }

    #[test]
    fn test_principal_deployment_reads_params_config_map() {
        let install = install(ArgoCDSpec::default());
        let deploy = principal_deployment(&install);
        let env = deploy.spec.unwrap().template.spec.unwrap().containers[0]
            .env
            .clone()
            .unwrap();
        let port = env
            .iter()
            .find(|e| e.name == "ARGOCD_PRINCIPAL_LISTEN_PORT")
            .unwrap();
        let selector = port
            .value_from
            .as_ref()
            .unwrap()
            .config_map_key_ref
            .as_ref()
            .unwrap();
        assert_eq!(selector.key, "principal.listen.port");
    }

    #[test]
    fn test_agent_image_accepts_full_reference() {
        let install = install(ArgoCDSpec::default());
        assert_eq!(
            agent_image(&install, Some(&"registry/agent:v9".to_string())),
            "registry/agent:v9"
        );
        assert_eq!(
            agent_image(&install, None),
            "quay.io/argoprojlabs/argocd-agent:v0.1.0"
        );
    }
}
