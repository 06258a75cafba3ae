//! # Status
//!
//! Component phases derived from workload status, the overall instance
//! phase, and the status subresource patch.

use super::types::OperatorError;
use crate::crd::{set_condition, ArgoCDStatus, ComponentPhase, Condition, InstancePhase};
use crate::resources::Install;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use kube::api::{Api, Patch, PatchParams};
use kube::Resource;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

pub const RECONCILED_CONDITION: &str = "Reconciled";

/// Phase of a Deployment
///
/// `Failed` once the rollout exceeded its progress deadline, `Running` when
/// every desired replica is ready.
pub fn deployment_phase(deployment: &Deployment) -> ComponentPhase {
    let status = deployment.status.as_ref();
    let deadline_exceeded = status
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions.iter().any(|c| {
                c.type_ == "Progressing" && c.reason.as_deref() == Some("ProgressDeadlineExceeded")
            })
        });
    if deadline_exceeded {
        return ComponentPhase::Failed;
    }
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
    if ready >= desired {
        ComponentPhase::Running
    } else {
        ComponentPhase::Pending
    }
}

pub fn stateful_set_phase(stateful_set: &StatefulSet) -> ComponentPhase {
    let desired = stateful_set
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let ready = stateful_set
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0);
    if ready >= desired {
        ComponentPhase::Running
    } else {
        ComponentPhase::Pending
    }
}

/// Least healthy of two phases belonging to the same component
pub fn worst(a: ComponentPhase, b: ComponentPhase) -> ComponentPhase {
    fn rank(p: ComponentPhase) -> u8 {
        match p {
            ComponentPhase::Running => 0,
            ComponentPhase::Unknown => 1,
            ComponentPhase::Pending => 2,
            ComponentPhase::Failed => 3,
        }
    }
    if rank(a) >= rank(b) {
        a
    } else {
        b
    }
}

/// Per-component phases gathered during a reconcile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentPhases {
    pub application_controller: ComponentPhase,
    pub application_set_controller: ComponentPhase,
    pub server: ComponentPhase,
    pub repo: ComponentPhase,
    pub redis: ComponentPhase,
    pub sso: ComponentPhase,
    pub notifications_controller: ComponentPhase,
    pub principal: ComponentPhase,
    pub agent: ComponentPhase,
}

impl ComponentPhases {
    fn all(&self) -> [ComponentPhase; 9] {
        [
            self.application_controller,
            self.application_set_controller,
            self.server,
            self.repo,
            self.redis,
            self.sso,
            self.notifications_controller,
            self.principal,
            self.agent,
        ]
    }

    /// `Available` when every enabled component runs; disabled (`Unknown`)
    /// components are ignored
    pub fn overall(&self) -> InstancePhase {
        let all_running = self
            .all()
            .iter()
            .filter(|p| **p != ComponentPhase::Unknown)
            .all(|p| *p == ComponentPhase::Running);
        if all_running {
            InstancePhase::Available
        } else {
            InstancePhase::Pending
        }
    }
}

/// Status after a successful reconcile
pub fn ready_status(
    previous: Option<&ArgoCDStatus>,
    install: &Install,
    phases: &ComponentPhases,
    host: String,
    generation: Option<i64>,
) -> ArgoCDStatus {
    let mut conditions = previous.map(|s| s.conditions.clone()).unwrap_or_default();
    let phase = phases.overall();
    let message = match phase {
        InstancePhase::Available => "All components are running".to_string(),
        _ => "Waiting for components to become ready".to_string(),
    };
    set_condition(
        &mut conditions,
        Condition::new(RECONCILED_CONDITION, true, "ReconcileSucceeded", message),
    );
    ArgoCDStatus {
        application_controller: phases.application_controller,
        application_set_controller: phases.application_set_controller,
        server: phases.server,
        repo: phases.repo,
        redis: phases.redis,
        sso: phases.sso,
        notifications_controller: phases.notifications_controller,
        principal: phases.principal,
        agent: phases.agent,
        phase,
        host: Some(host),
        repo_tls_checksum: install.repo_tls_checksum.clone(),
        redis_tls_checksum: install.redis_tls_checksum.clone(),
        observed_generation: generation,
        conditions,
    }
}

/// Status after a failed reconcile; component phases are kept as last seen
pub fn failed_status(
    previous: Option<&ArgoCDStatus>,
    error: &OperatorError,
    generation: Option<i64>,
) -> ArgoCDStatus {
    let mut status = previous.cloned().unwrap_or_default();
    status.phase = InstancePhase::Failed;
    status.observed_generation = generation;
    set_condition(
        &mut status.conditions,
        Condition::new(RECONCILED_CONDITION, false, error.reason(), error.to_string()),
    );
    status
}

/// Merge patch body turning `previous` into `status`
///
/// Fields set before and now empty are sent as `null`, otherwise the
/// merge would keep the stale value.
pub fn status_patch(
    previous: Option<&ArgoCDStatus>,
    status: &ArgoCDStatus,
) -> Result<serde_json::Value, OperatorError> {
    let mut body = serde_json::to_value(status)?;
    if let Some(previous) = previous {
        if let (serde_json::Value::Object(old), Some(fields)) =
            (serde_json::to_value(previous)?, body.as_object_mut())
        {
            for key in old.keys() {
                fields
                    .entry(key.clone())
                    .or_insert(serde_json::Value::Null);
            }
        }
    }
    Ok(serde_json::json!({ "status": body }))
}

/// Patch the status subresource unless it already matches
///
/// Returns whether a patch was sent. Skipping identical writes keeps the
/// operator from waking itself up through its own watch.
pub async fn patch_status<K>(
    api: &Api<K>,
    name: &str,
    previous: Option<&ArgoCDStatus>,
    status: &ArgoCDStatus,
) -> Result<bool, OperatorError>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    if previous == Some(status) {
        debug!(name = %name, "Status unchanged, skipping patch");
        return Ok(false);
    }
    let patch = status_patch(previous, status)?;
    api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ArgoCDSpec;
    use crate::resources::test_support::install;
    use k8s_openapi::api::apps::v1::{
        DeploymentCondition, DeploymentSpec, DeploymentStatus, StatefulSetSpec, StatefulSetStatus,
    };

    fn deployment(replicas: i32, ready: i32, condition: Option<&str>) -> Deployment {
        Deployment {
            spec: Some(DeploymentSpec {
                replicas: Some(replicas),
                ..Default::default()
            }),
            status: Some(DeploymentStatus {
                ready_replicas: Some(ready),
                conditions: condition.map(|reason| {
                    vec![DeploymentCondition {
                        type_: "Progressing".into(),
                        status: "False".into(),
                        reason: Some(reason.into()),
                        ..Default::default()
                    }]
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_deployment_phases() {
        assert_eq!(deployment_phase(&deployment(2, 2, None)), ComponentPhase::Running);
        assert_eq!(deployment_phase(&deployment(2, 1, None)), ComponentPhase::Pending);
        assert_eq!(
            deployment_phase(&deployment(2, 0, Some("ProgressDeadlineExceeded"))),
            ComponentPhase::Failed
        );
        assert_eq!(deployment_phase(&Deployment::default()), ComponentPhase::Pending);
    }

    #[test]
    fn test_stateful_set_phase() {
        let sts = StatefulSet {
            spec: Some(StatefulSetSpec {
                replicas: Some(3),
                ..Default::default()
            }),
            status: Some(StatefulSetStatus {
                ready_replicas: Some(3),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(stateful_set_phase(&sts), ComponentPhase::Running);
    }

    #[test]
    fn test_status_patch_clears_removed_checksum() {
        let previous = ArgoCDStatus {
            repo_tls_checksum: Some("abc".into()),
            redis_tls_checksum: Some("def".into()),
            ..Default::default()
        };
        let status = ArgoCDStatus {
            redis_tls_checksum: Some("def".into()),
            ..Default::default()
        };
        let patch = status_patch(Some(&previous), &status).unwrap();
        assert_eq!(patch["status"]["repoTLSChecksum"], serde_json::Value::Null);
        assert!(patch["status"]
            .as_object()
            .unwrap()
            .contains_key("repoTLSChecksum"));
        assert_eq!(patch["status"]["redisTLSChecksum"], "def");
    }

    #[test]
    fn test_status_patch_without_previous_has_no_nulls() {
        let status = ArgoCDStatus::default();
        let patch = status_patch(None, &status).unwrap();
        let fields = patch["status"].as_object().unwrap();
        assert!(!fields.contains_key("repoTLSChecksum"));
        assert!(fields.values().all(|v| !v.is_null()));
    }

    #[test]
    fn test_overall_phase_ignores_disabled_components() {
        let mut phases = ComponentPhases {
            application_controller: ComponentPhase::Running,
            server: ComponentPhase::Running,
            ..Default::default()
        };
        assert_eq!(phases.overall(), InstancePhase::Available);
        phases.repo = ComponentPhase::Pending;
        assert_eq!(phases.overall(), InstancePhase::Pending);
        phases.repo = ComponentPhase::Failed;
        assert_eq!(phases.overall(), InstancePhase::Pending);
    }

    #[test]
    fn test_worst_phase() {
        assert_eq!(worst(ComponentPhase::Running, ComponentPhase::Pending), ComponentPhase::Pending);
        assert_eq!(worst(ComponentPhase::Failed, ComponentPhase::Pending), ComponentPhase::Failed);
    }

    #[test]
    fn test_ready_status_is_stable_across_reconciles() {
        let install = install(ArgoCDSpec::default());
        let phases = ComponentPhases {
            server: ComponentPhase::Running,
            ..Default::default()
        };
        let first = ready_status(None, &install, &phases, "h".into(), Some(1));
        let second = ready_status(Some(&first), &install, &phases, "h".into(), Some(1));
        assert_eq!(first, second);
        assert_eq!(second.phase, InstancePhase::Available);
    }

    #[test]
    fn test_failed_status_keeps_component_phases() {
        let previous = ArgoCDStatus {
            server: ComponentPhase::Running,
            ..Default::default()
        };
        let err = OperatorError::InvalidResource("bad".into());
        let status = failed_status(Some(&previous), &err, Some(2));
        assert_eq!(status.phase, InstancePhase::Failed);
        assert_eq!(status.server, ComponentPhase::Running);
        assert_eq!(status.conditions[0].status, "False");
        assert_eq!(status.conditions[0].reason.as_deref(), Some("InvalidResource"));
    }
}
