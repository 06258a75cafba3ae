//! # Spec Validation
//!
//! Checks that cannot be expressed in the CRD schema. The admission webhook
//! only enforces the sharding exclusivity check; the reconciler runs the full
//! set so clusters without the webhook still surface errors in status.

use crate::crd::{ArgoCDSpec, SSOProviderType};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "spec.controller.sharding.enabled and spec.controller.sharding.dynamicScalingEnabled are mutually exclusive"
    )]
    ShardingConflict,

    #[error("spec.controller.sharding.minShards ({min}) must not exceed maxShards ({max})")]
    ShardBounds { min: i32, max: i32 },

    #[error("spec.sso.dex.openShiftOAuth and spec.sso.dex.config are mutually exclusive")]
    DexConfigConflict,

    #[error("spec.sso.{block} is set but spec.sso.provider is not {block}")]
    SsoProviderMismatch { block: &'static str },

    #[error("spec.argoCDAgent.principal and spec.argoCDAgent.agent cannot both be enabled")]
    AgentConflict,
}

/// The check the admission webhook enforces
pub fn validate_sharding(spec: &ArgoCDSpec) -> Result<(), ValidationError> {
    let sharding = &spec.controller.sharding;
    if sharding.enabled && sharding.dynamic_scaling() {
        return Err(ValidationError::ShardingConflict);
    }
    Ok(())
}

/// SSO blocks must match the selected provider
pub fn validate_sso(spec: &ArgoCDSpec) -> Result<(), ValidationError> {
    let sso = spec.sso_spec();
    if sso.dex.is_some() && sso.provider != Some(SSOProviderType::Dex) {
        return Err(ValidationError::SsoProviderMismatch { block: "dex" });
    }
    if sso.keycloak.is_some() && sso.provider != Some(SSOProviderType::Keycloak) {
        return Err(ValidationError::SsoProviderMismatch { block: "keycloak" });
    }
    if let Some(dex) = &sso.dex {
        if dex.open_shift_oauth && dex.config.as_deref().is_some_and(|c| !c.trim().is_empty()) {
            return Err(ValidationError::DexConfigConflict);
        }
    }
    Ok(())
}

/// Full validation run before anything is applied
pub fn validate_spec(spec: &ArgoCDSpec) -> Result<(), ValidationError> {
    validate_sharding(spec)?;

    let sharding = &spec.controller.sharding;
    if sharding.dynamic_scaling() {
        if let (Some(min), Some(max)) = (sharding.min_shards, sharding.max_shards) {
            if min > max {
                return Err(ValidationError::ShardBounds { min, max });
            }
        }
    }

    validate_sso(spec)?;

    let agent = spec.agent_spec();
    if agent.principal_enabled() && agent.agent_enabled() {
        return Err(ValidationError::AgentConflict);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        AgentSpec, ArgoCDAgentSpec, ArgoCDDexSpec, ArgoCDSSOSpec, PrincipalSpec, ShardingSpec,
    };

    fn sharding(enabled: bool, dynamic: Option<bool>) -> ArgoCDSpec {
        let mut spec = ArgoCDSpec::default();
        spec.controller.sharding = ShardingSpec {
            enabled,
            dynamic_scaling_enabled: dynamic,
            ..Default::default()
        };
        spec
    }

    #[test]
    fn test_sharding_exclusivity() {
        assert_eq!(
            validate_sharding(&sharding(true, Some(true))),
            Err(ValidationError::ShardingConflict)
        );
        assert!(validate_sharding(&sharding(true, Some(false))).is_ok());
        assert!(validate_sharding(&sharding(false, Some(true))).is_ok());
        assert!(validate_sharding(&sharding(true, None)).is_ok());
    }

    #[test]
    fn test_shard_bounds() {
        let mut spec = sharding(false, Some(true));
        spec.controller.sharding.min_shards = Some(4);
        spec.controller.sharding.max_shards = Some(2);
        assert_eq!(
            validate_spec(&spec),
            Err(ValidationError::ShardBounds { min: 4, max: 2 })
        );
    }

    #[test]
    fn test_dex_block_requires_dex_provider() {
        let spec = ArgoCDSpec {
            sso: Some(ArgoCDSSOSpec {
                provider: None,
                dex: Some(ArgoCDDexSpec::default()),
                keycloak: None,
            }),
            ..Default::default()
        };
        assert_eq!(
            validate_spec(&spec),
            Err(ValidationError::SsoProviderMismatch { block: "dex" })
        );
    }

    #[test]
    fn test_openshift_oauth_with_custom_config() {
        let spec = ArgoCDSpec {
            sso: Some(ArgoCDSSOSpec {
                provider: Some(SSOProviderType::Dex),
                dex: Some(ArgoCDDexSpec {
                    open_shift_oauth: true,
                    config: Some("connectors: []".into()),
                    ..Default::default()
                }),
                keycloak: None,
            }),
            ..Default::default()
        };
        assert_eq!(validate_spec(&spec), Err(ValidationError::DexConfigConflict));
    }

    #[test]
    fn test_principal_and_agent_together() {
        let spec = ArgoCDSpec {
            argocd_agent: Some(ArgoCDAgentSpec {
                principal: Some(PrincipalSpec {
                    enabled: true,
                    ..Default::default()
                }),
                agent: Some(AgentSpec {
                    enabled: true,
                    ..Default::default()
                }),
            }),
            ..Default::default()
        };
        assert_eq!(validate_spec(&spec), Err(ValidationError::AgentConflict));
    }

    #[test]
    fn test_default_spec_is_valid() {
        assert!(validate_spec(&ArgoCDSpec::default()).is_ok());
    }
}
