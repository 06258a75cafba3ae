//! # Network Policies
//!
//! One policy per workload, admitting ingress only on the component's ports.
//! Redis additionally only accepts traffic from the components that use it.

use super::common::{metadata, selector_labels};
use super::{Component, Install};
use crate::constants::*;
use k8s_openapi::api::networking::v1::{
    NetworkPolicy, NetworkPolicyIngressRule, NetworkPolicyPeer, NetworkPolicyPort,
    NetworkPolicySpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

fn ports_for(component: Component) -> Vec<i32> {
    match component {
        Component::ApplicationController => vec![CONTROLLER_METRICS_PORT],
        Component::Server => vec![SERVER_HTTP_PORT, SERVER_METRICS_PORT],
        Component::RepoServer => vec![REPO_SERVER_PORT, REPO_SERVER_METRICS_PORT],
        Component::Redis | Component::RedisHa | Component::RedisHaProxy => vec![REDIS_PORT],
        Component::Dex => vec![DEX_HTTP_PORT, DEX_GRPC_PORT],
        Component::Notifications => vec![NOTIFICATIONS_METRICS_PORT],
        Component::ApplicationSet => vec![APPSET_WEBHOOK_PORT, APPSET_METRICS_PORT],
        Component::Principal => vec![PRINCIPAL_GRPC_PORT],
        Component::Agent => vec![AGENT_METRICS_PORT],
    }
}

/// Components allowed to reach redis
const REDIS_CLIENTS: [Component; 5] = [
    Component::ApplicationController,
    Component::Server,
    Component::RepoServer,
    Component::Principal,
    Component::Agent,
];

fn peer(install: &Install, component: Component) -> NetworkPolicyPeer {
    NetworkPolicyPeer {
        pod_selector: Some(LabelSelector {
            match_labels: Some(selector_labels(install, component)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn policy(install: &Install, component: Component) -> NetworkPolicy {
    let ports = ports_for(component)
        .into_iter()
        .map(|p| NetworkPolicyPort {
            port: Some(IntOrString::Int(p)),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        })
        .collect();
    let from = match component {
        Component::Redis | Component::RedisHa => {
            let mut peers: Vec<_> = REDIS_CLIENTS.iter().map(|c| peer(install, *c)).collect();
            if component == Component::RedisHa {
                peers.push(peer(install, Component::RedisHa));
                peers.push(peer(install, Component::RedisHaProxy));
            }
            Some(peers)
        }
        Component::RedisHaProxy => Some(REDIS_CLIENTS.iter().map(|c| peer(install, *c)).collect()),
        _ => None,
    };
    NetworkPolicy {
        metadata: metadata(
            install,
            format!("{}-network-policy", install.resource_name(component)),
            component,
        ),
        spec: Some(NetworkPolicySpec {
            pod_selector: Some(LabelSelector {
                match_labels: Some(selector_labels(install, component)),
                ..Default::default()
            }),
            policy_types: Some(vec!["Ingress".to_string()]),
            ingress: Some(vec![NetworkPolicyIngressRule {
                from,
                ports: Some(ports),
            }]),
            ..Default::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ArgoCDSpec;
    use crate::resources::test_support::install;

    #[test]
    fn test_redis_only_admits_known_clients() {
        let np = policy(&install(ArgoCDSpec::default()), Component::Redis);
        let rule = &np.spec.unwrap().ingress.unwrap()[0];
        let from = rule.from.as_ref().unwrap();
        assert_eq!(from.len(), REDIS_CLIENTS.len());
        assert_eq!(
            rule.ports.as_ref().unwrap()[0].port,
            Some(IntOrString::Int(6379))
        );
    }

    #[test]
    fn test_server_policy_is_open_on_its_ports() {
        let np = policy(&install(ArgoCDSpec::default()), Component::Server);
        assert_eq!(
            np.metadata.name.as_deref(),
            Some("example-server-network-policy")
        );
        let rule = &np.spec.unwrap().ingress.unwrap()[0];
        assert!(rule.from.is_none());
        assert_eq!(rule.ports.as_ref().unwrap().len(), 2);
    }
}
