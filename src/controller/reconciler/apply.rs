//! # Server-Side Apply
//!
//! Every object the operator owns is written with server-side apply under
//! the `argocd-operator` field manager. Before force-applying, the existing
//! object (if any) must not carry another manager's
//! `app.kubernetes.io/managed-by` label.

use super::types::OperatorError;
use crate::constants::{FIELD_MANAGER, LABEL_MANAGED_BY, MANAGED_BY_VALUE, RECONCILE_ANNOTATION};
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::{Api, ApiResource, DeleteParams, DynamicObject, Patch, PatchParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// Reject objects labelled as managed by something else
///
/// Objects without the label (e.g. created by hand before the operator took
/// over) are adopted.
pub fn verify_ownership<K>(existing: &K) -> Result<(), OperatorError>
where
    K: Resource,
    K::DynamicType: Default,
{
    let managed_by = existing
        .meta()
        .labels
        .as_ref()
        .and_then(|l| l.get(LABEL_MANAGED_BY));
    match managed_by {
        Some(manager) if manager != MANAGED_BY_VALUE => Err(OperatorError::OwnershipConflict {
            kind: K::kind(&Default::default()).to_string(),
            name: existing.name_any(),
            manager: manager.clone(),
        }),
        _ => Ok(()),
    }
}

/// Force-apply `obj` through `api`
pub async fn apply<K>(api: &Api<K>, obj: &K) -> Result<K, OperatorError>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Debug,
    K::DynamicType: Default,
{
    let name = obj.meta().name.clone().ok_or_else(|| {
        OperatorError::InvalidResource(format!(
            "{} missing metadata.name",
            K::kind(&Default::default())
        ))
    })?;

    if let Some(existing) = api.get_opt(&name).await? {
        verify_ownership(&existing)?;
    }

    debug!(kind = %K::kind(&Default::default()), name = %name, "Applying");
    let params = PatchParams::apply(FIELD_MANAGER).force();
    Ok(api.patch(&name, &params, &Patch::Apply(obj)).await?)
}

/// Apply a namespaced object into the namespace set in its metadata
pub async fn apply_namespaced<K>(client: &Client, obj: &K) -> Result<K, OperatorError>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Serialize
        + DeserializeOwned
        + Debug,
{
    let namespace = obj.meta().namespace.clone().ok_or_else(|| {
        OperatorError::InvalidResource(format!("{} {} missing namespace", K::kind(&()), obj.name_any()))
    })?;
    let api: Api<K> = Api::namespaced(client.clone(), &namespace);
    apply(&api, obj).await
}

pub async fn apply_cluster<K>(client: &Client, obj: &K) -> Result<K, OperatorError>
where
    K: Resource<Scope = ClusterResourceScope, DynamicType = ()>
        + Clone
        + Serialize
        + DeserializeOwned
        + Debug,
{
    let api: Api<K> = Api::all(client.clone());
    apply(&api, obj).await
}

/// Apply an object whose type is only known at runtime (OpenShift Route)
pub async fn apply_dynamic(
    client: &Client,
    resource: &ApiResource,
    obj: &DynamicObject,
) -> Result<DynamicObject, OperatorError> {
    let namespace = obj.namespace().ok_or_else(|| {
        OperatorError::InvalidResource(format!("{} {} missing namespace", resource.kind, obj.name_any()))
    })?;
    let name = obj.name_any();
    let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), &namespace, resource);
    if let Some(existing) = api.get_opt(&name).await? {
        let managed_by = existing.labels().get(LABEL_MANAGED_BY);
        if let Some(manager) = managed_by.filter(|m| *m != MANAGED_BY_VALUE) {
            return Err(OperatorError::OwnershipConflict {
                kind: resource.kind.clone(),
                name,
                manager: manager.clone(),
            });
        }
    }
    let params = PatchParams::apply(FIELD_MANAGER).force();
    Ok(api.patch(&name, &params, &Patch::Apply(obj)).await?)
}

/// Whether the object carries our managed-by label
///
/// Adoption on apply is fine, deletion is not: an unlabelled object may
/// belong to a user.
pub fn is_managed<K: Resource>(obj: &K) -> bool {
    obj.labels()
        .get(LABEL_MANAGED_BY)
        .is_some_and(|manager| manager == MANAGED_BY_VALUE)
}

/// Drop the `argocdctl reconcile` annotation once it has been honoured
pub async fn clear_manual_trigger<K>(api: &Api<K>, name: &str) -> Result<(), OperatorError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let patch = serde_json::json!({
        "metadata": { "annotations": { RECONCILE_ANNOTATION: serde_json::Value::Null } }
    });
    api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    debug!(name = %name, "Cleared manual trigger annotation");
    Ok(())
}

/// Delete `name` if it exists; returns whether anything was deleted
///
/// Only objects labelled as ours are deleted.
pub async fn delete_if_exists<K>(api: &Api<K>, name: &str) -> Result<bool, OperatorError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
    K::DynamicType: Default,
{
    let Some(existing) = api.get_opt(name).await? else {
        return Ok(false);
    };
    if !is_managed(&existing) {
        debug!(kind = %K::kind(&Default::default()), name = %name, "Not ours, skipping delete");
        return Ok(false);
    }
    match api.delete(name, &DeleteParams::background()).await {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Delete a namespaced object by name
pub async fn delete_namespaced<K>(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<bool, OperatorError>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug,
{
    let api: Api<K> = Api::namespaced(client.clone(), namespace);
    delete_if_exists(&api, name).await
}

pub async fn delete_cluster<K>(client: &Client, name: &str) -> Result<bool, OperatorError>
where
    K: Resource<Scope = ClusterResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    let api: Api<K> = Api::all(client.clone());
    delete_if_exists(&api, name).await
}

/// Delete a dynamic object such as a Route
///
/// A cluster without the API answers 404 and has nothing to delete.
pub async fn delete_dynamic(
    client: &Client,
    resource: &ApiResource,
    namespace: &str,
    name: &str,
) -> Result<bool, OperatorError> {
    let api: Api<DynamicObject> = Api::namespaced_with(client.clone(), namespace, resource);
    let Some(existing) = api.get_opt(name).await? else {
        return Ok(false);
    };
    if !is_managed(&existing) {
        debug!(kind = %resource.kind, name = %name, "Not ours, skipping delete");
        return Ok(false);
    }
    match api.delete(name, &DeleteParams::background()).await {
        Ok(_) => Ok(true),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(false),
        Err(e) => Err(e.into()),
    }
}
