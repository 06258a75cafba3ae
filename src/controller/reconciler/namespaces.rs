//! # Managed Namespaces
//!
//! RBAC for the namespaces an install manages outside its own: namespaces
//! labelled `argocd.argoproj.io/managed-by=<install namespace>` and the
//! entries of `sourceNamespaces`. Owner references cannot cross namespaces,
//! so stale grants are pruned by label and released by the finalizer.

use super::apply::{apply_namespaced, delete_namespaced};
use super::types::OperatorError;
use crate::constants::{LABEL_INSTANCE, LABEL_MANAGED_BY, MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::resources::rbac::{
    managed_namespace_role, managed_namespace_role_binding, managed_namespace_role_name,
    MANAGED_NAMESPACE_COMPONENTS,
};
use crate::resources::{Component, Install};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use regex::Regex;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Shell-style glob match (`*` and `?`) against a whole namespace name
pub fn glob_matches(pattern: &str, name: &str) -> bool {
    let mut re = String::with_capacity(pattern.len() + 2);
    re.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).is_ok_and(|r| r.is_match(name))
}

fn is_pattern(value: &str) -> bool {
    value.contains(['*', '?'])
}

fn enabled_components(install: &Install) -> Vec<Component> {
    MANAGED_NAMESPACE_COMPONENTS
        .into_iter()
        .filter(|c| match c {
            Component::ApplicationController => install.spec.controller.enabled,
            Component::Server => install.spec.server.enabled,
            _ => true,
        })
        .collect()
}

/// Every namespace the install currently manages, its own excluded
pub async fn managed_namespaces(
    client: &Client,
    install: &Install,
) -> Result<BTreeSet<String>, OperatorError> {
    let api: Api<Namespace> = Api::all(client.clone());
    let selector = format!("{}={}", MANAGED_BY_LABEL, install.namespace);
    let mut namespaces: BTreeSet<String> = api
        .list(&ListParams::default().labels(&selector))
        .await?
        .items
        .iter()
        .map(|ns| ns.name_any())
        .collect();

    let sources = &install.spec.source_namespaces;
    namespaces.extend(sources.iter().filter(|s| !is_pattern(s)).cloned());
    if sources.iter().any(|s| is_pattern(s)) {
        for ns in api.list(&ListParams::default()).await?.items {
            let name = ns.name_any();
            if sources.iter().any(|p| is_pattern(p) && glob_matches(p, &name)) {
                namespaces.insert(name);
            }
        }
    }
    namespaces.remove(&install.namespace);
    Ok(namespaces)
}

/// Role and RoleBinding for each enabled component inside `namespace`
pub async fn grant(client: &Client, install: &Install, namespace: &str) -> Result<(), OperatorError> {
    for component in enabled_components(install) {
        apply_namespaced(client, &managed_namespace_role(install, component, namespace)).await?;
        apply_namespaced(
            client,
            &managed_namespace_role_binding(install, component, namespace),
        )
        .await?;
    }
    Ok(())
}

pub async fn revoke(client: &Client, install: &Install, namespace: &str) -> Result<(), OperatorError> {
    for component in MANAGED_NAMESPACE_COMPONENTS {
        let name = managed_namespace_role_name(install, component);
        delete_namespaced::<RoleBinding>(client, namespace, &name).await?;
        delete_namespaced::<Role>(client, namespace, &name).await?;
    }
    Ok(())
}

/// Namespaces that still hold a grant from this install
async fn granted_namespaces(
    client: &Client,
    install: &Install,
) -> Result<BTreeSet<String>, OperatorError> {
    let api: Api<Role> = Api::all(client.clone());
    let selector = format!(
        "{}={},{}={}",
        LABEL_MANAGED_BY, MANAGED_BY_VALUE, LABEL_INSTANCE, install.name
    );
    let names: Vec<String> = MANAGED_NAMESPACE_COMPONENTS
        .iter()
        .map(|c| managed_namespace_role_name(install, *c))
        .collect();
    Ok(api
        .list(&ListParams::default().labels(&selector))
        .await?
        .items
        .into_iter()
        .filter(|role| names.contains(&role.name_any()))
        .filter_map(|role| role.namespace())
        .filter(|ns| *ns != install.namespace)
        .collect())
}

/// Grant every managed namespace and prune grants that are no longer wanted
pub async fn reconcile_managed_namespaces(
    client: &Client,
    install: &Install,
) -> Result<BTreeSet<String>, OperatorError> {
    let wanted = managed_namespaces(client, install).await?;
    for namespace in &wanted {
        grant(client, install, namespace).await?;
    }
    for namespace in granted_namespaces(client, install).await? {
        if !wanted.contains(&namespace) {
            info!(namespace = %namespace, "Namespace no longer managed, revoking access");
            revoke(client, install, &namespace).await?;
        }
    }
    Ok(wanted)
}

/// Set or clear the managed-by label on a namespace
///
/// Clearing only touches the label when it still points at `managed_by`.
pub async fn set_managed_by_label(
    client: &Client,
    namespace: &str,
    managed_by: &str,
    present: bool,
) -> Result<(), OperatorError> {
    let api: Api<Namespace> = Api::all(client.clone());
    let current = api
        .get_opt(namespace)
        .await?
        .and_then(|ns| ns.labels().get(MANAGED_BY_LABEL).cloned());
    let value = match (present, current.as_deref()) {
        (true, Some(v)) if v == managed_by => return Ok(()),
        (true, _) => serde_json::Value::String(managed_by.to_string()),
        (false, Some(v)) if v == managed_by => serde_json::Value::Null,
        (false, _) => return Ok(()),
    };
    let patch = serde_json::json!({
        "metadata": { "labels": { MANAGED_BY_LABEL: value } }
    });
    api.patch(namespace, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    debug!(namespace = %namespace, present, "Updated {} label", MANAGED_BY_LABEL);
    Ok(())
}

/// Revoke every grant and label held by the install, used on deletion
pub async fn release_all(client: &Client, install: &Install) -> Result<(), OperatorError> {
    let mut namespaces = managed_namespaces(client, install).await?;
    namespaces.extend(granted_namespaces(client, install).await?);
    for namespace in &namespaces {
        revoke(client, install, namespace).await?;
        set_managed_by_label(client, namespace, &install.namespace, false).await?;
    }
    info!(count = namespaces.len(), "Released managed namespaces");
    Ok(())
}
