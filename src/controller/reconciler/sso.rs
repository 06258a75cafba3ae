//! # SSO Reconciler
//!
//! Runs dex when it is the selected provider and reports the `sso` phase.
//! Keycloak is accepted by the schema but not deployed: it relies on
//! OpenShift templates, so it is reported as `Failed` with a message.

use super::apply::apply_namespaced;
use super::components::{apply_identity, remove_workload};
use super::status::deployment_phase;
use super::types::OperatorError;
use super::validation::validate_sso;
use crate::crd::{ComponentPhase, SSOProviderType};
use crate::resources::{dex, Component, Install};
use kube::Client;
use tracing::{debug, warn};

/// Result of an SSO reconcile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoOutcome {
    pub phase: ComponentPhase,
    /// Set when the configuration cannot be served
    pub message: Option<String>,
}

pub struct SsoReconciler<'a> {
    client: &'a Client,
}

impl std::fmt::Debug for SsoReconciler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsoReconciler").finish_non_exhaustive()
    }
}

impl<'a> SsoReconciler<'a> {
    #[must_use]
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn reconcile(&self, install: &Install) -> Result<SsoOutcome, OperatorError> {
        validate_sso(&install.spec)?;
        match install.spec.sso_spec().provider {
            Some(SSOProviderType::Dex) => {
                apply_identity(self.client, install, Component::Dex).await?;
                apply_namespaced(self.client, &dex::service_for(install)).await?;
                let deploy = apply_namespaced(self.client, &dex::deployment_for(install)).await?;
                Ok(SsoOutcome {
                    phase: deployment_phase(&deploy),
                    message: None,
                })
            }
            Some(SSOProviderType::Keycloak) => {
                remove_workload(self.client, install, Component::Dex).await?;
                let message = keycloak_unsupported();
                warn!(instance = %install.name, "{}", message);
                Ok(SsoOutcome {
                    phase: ComponentPhase::Failed,
                    message: Some(message),
                })
            }
            None => {
                remove_workload(self.client, install, Component::Dex).await?;
                debug!(instance = %install.name, "SSO disabled");
                Ok(SsoOutcome {
                    phase: ComponentPhase::Unknown,
                    message: None,
                })
            }
        }
    }
}

fn keycloak_unsupported() -> String {
    "keycloak SSO requires OpenShift templates and is not deployed by this operator; use dex instead"
        .to_string()
}
