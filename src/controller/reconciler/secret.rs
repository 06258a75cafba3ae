//! # Secret Reconciler
//!
//! Owns `argocd-secret` and tracks the TLS secrets used by the repo server
//! and redis. A checksum of each TLS secret is stamped on the matching pod
//! templates and recorded in status, so a rotated certificate rolls the pods.

use super::apply::apply_namespaced;
use super::types::OperatorError;
use crate::constants::{ARGOCD_REDIS_TLS_SECRET, ARGOCD_REPO_SERVER_TLS_SECRET, ARGOCD_SECRET};
use crate::resources::secrets::{
    argocd_secret, data_checksum, secret_value, DEX_CLIENT_SECRET_KEY, SERVER_SECRET_KEY,
};
use crate::resources::Install;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Checksums found for the TLS secrets, `None` when a secret is absent or empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsChecksums {
    pub repo: Option<String>,
    pub redis: Option<String>,
}

pub struct SecretReconciler<'a> {
    client: &'a Client,
}

impl std::fmt::Debug for SecretReconciler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretReconciler").finish_non_exhaustive()
    }
}

impl<'a> SecretReconciler<'a> {
    #[must_use]
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Fetch a secret from the install namespace, `None` on 404
    pub async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Secret>, OperatorError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    /// Converge `argocd-secret` and refresh the install's TLS checksums
    pub async fn reconcile(&self, install: &mut Install) -> Result<TlsChecksums, OperatorError> {
        self.ensure_argocd_secret(install).await?;

        let checksums = self.tls_checksums(&install.namespace).await?;
        if checksums.repo != install.repo_tls_checksum {
            info!(
                secret = ARGOCD_REPO_SERVER_TLS_SECRET,
                "Repo server TLS secret changed, rolling repo server"
            );
        }
        if checksums.redis != install.redis_tls_checksum {
            info!(
                secret = ARGOCD_REDIS_TLS_SECRET,
                "Redis TLS secret changed, rolling redis clients"
            );
        }
        install.repo_tls_checksum.clone_from(&checksums.repo);
        install.redis_tls_checksum.clone_from(&checksums.redis);
        Ok(checksums)
    }

    pub async fn tls_checksums(&self, namespace: &str) -> Result<TlsChecksums, OperatorError> {
        let repo = self
            .get_secret(namespace, ARGOCD_REPO_SERVER_TLS_SECRET)
            .await?
            .as_ref()
            .and_then(data_checksum);
        let redis = self
            .get_secret(namespace, ARGOCD_REDIS_TLS_SECRET)
            .await?
            .as_ref()
            .and_then(data_checksum);
        Ok(TlsChecksums { repo, redis })
    }

    /// Keys are generated once and preserved on every later reconcile
    async fn ensure_argocd_secret(&self, install: &Install) -> Result<(), OperatorError> {
        let existing = self.get_secret(&install.namespace, ARGOCD_SECRET).await?;
        let data = secret_data(install, existing.as_ref());
        if existing.is_none() {
            debug!(namespace = %install.namespace, "Creating {}", ARGOCD_SECRET);
        }
        apply_namespaced(self.client, &argocd_secret(install, &data)).await?;
        Ok(())
    }
}

fn generate_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Data written to `argocd-secret`, reusing values already present
pub fn secret_data(install: &Install, existing: Option<&Secret>) -> BTreeMap<String, String> {
    let keep = |key: &str| existing.and_then(|s| secret_value(s, key));
    let mut data = BTreeMap::new();
    data.insert(
        SERVER_SECRET_KEY.to_string(),
        keep(SERVER_SECRET_KEY).unwrap_or_else(generate_key),
    );
    if install.spec.sso_spec().dex_enabled() {
        data.insert(
            DEX_CLIENT_SECRET_KEY.to_string(),
            keep(DEX_CLIENT_SECRET_KEY).unwrap_or_else(generate_key),
        );
    }
    data
}
