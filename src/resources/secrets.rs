//! # Secrets
//!
//! `argocd-secret` and TLS secret checksums.

use super::configmaps::config_metadata;
use super::Install;
use crate::constants::ARGOCD_SECRET;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub const SERVER_SECRET_KEY: &str = "server.secretkey";
pub const DEX_CLIENT_SECRET_KEY: &str = "oidc.dex.clientSecret";

/// `argocd-secret` with the given generated keys
pub fn argocd_secret(install: &Install, data: &BTreeMap<String, String>) -> Secret {
    Secret {
        metadata: config_metadata(install, ARGOCD_SECRET),
        type_: Some("Opaque".to_string()),
        data: Some(
            data.iter()
                .map(|(k, v)| (k.clone(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        ..Default::default()
    }
}

/// Read a UTF-8 value from a secret's data
pub fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|d| d.get(key))
        .and_then(|v| String::from_utf8(v.0.clone()).ok())
        .filter(|v| !v.is_empty())
}

/// SHA-256 over the secret's data, keys in sorted order
///
/// `None` when the secret holds no data, so an empty placeholder secret does
/// not roll the pods.
pub fn data_checksum(secret: &Secret) -> Option<String> {
    let data = secret.data.as_ref().filter(|d| !d.is_empty())?;
    let mut hasher = Sha256::new();
    for (key, value) in data {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(&value.0);
        hasher.update([0u8]);
    }
    Some(format!("{:x}", hasher.finalize()))
}
