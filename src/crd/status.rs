//! # ArgoCD Status
//!
//! Status types shared by `ArgoCD` and `ClusterArgoCD`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a single Argo CD component
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
pub enum ComponentPhase {
    Pending,
    Running,
    Failed,
    #[default]
    Unknown,
}

impl fmt::Display for ComponentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentPhase::Pending => "Pending",
            ComponentPhase::Running => "Running",
            ComponentPhase::Failed => "Failed",
            ComponentPhase::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Overall phase of an Argo CD instance
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
pub enum InstancePhase {
    Available,
    #[default]
    Pending,
    Failed,
}

impl fmt::Display for InstancePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstancePhase::Available => "Available",
            InstancePhase::Pending => "Pending",
            InstancePhase::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Status of an ArgoCD or ClusterArgoCD resource
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCDStatus {
    #[serde(default)]
    pub application_controller: ComponentPhase,
    #[serde(default)]
    pub application_set_controller: ComponentPhase,
    #[serde(default)]
    pub server: ComponentPhase,
    #[serde(default)]
    pub repo: ComponentPhase,
    #[serde(default)]
    pub redis: ComponentPhase,
    #[serde(default)]
    pub sso: ComponentPhase,
    #[serde(default)]
    pub notifications_controller: ComponentPhase,
    #[serde(default)]
    pub principal: ComponentPhase,
    #[serde(default)]
    pub agent: ComponentPhase,
    /// Available when every enabled component is Running
    #[serde(default)]
    pub phase: InstancePhase,
    /// Externally reachable host of the API server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, rename = "repoTLSChecksum", skip_serializing_if = "Option::is_none")]
    pub repo_tls_checksum: Option<String>,
    #[serde(default, rename = "redisTLSChecksum", skip_serializing_if = "Option::is_none")]
    pub redis_tls_checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Condition {
    pub fn new(r#type: &str, ok: bool, reason: &str, message: impl Into<String>) -> Self {
        Self {
            r#type: r#type.to_string(),
            status: if ok { "True" } else { "False" }.to_string(),
            last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
            reason: Some(reason.to_string()),
            message: Some(message.into()),
        }
    }

    /// Equal apart from the transition timestamp
    pub fn same_state(&self, other: &Condition) -> bool {
        self.r#type == other.r#type
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Replace the condition of the same type, keeping the old transition time
/// when nothing but the timestamp changed.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        if existing.same_state(&condition) {
            condition.last_transition_time = existing.last_transition_time.clone();
        }
        *existing = condition;
    } else {
        conditions.push(condition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_phase_serializes_as_plain_string() {
        let json = serde_json::to_string(&ComponentPhase::Running).unwrap();
        assert_eq!(json, "\"Running\"");
        let phase: ComponentPhase = serde_json::from_str("\"Failed\"").unwrap();
        assert_eq!(phase, ComponentPhase::Failed);
    }

    #[test]
    fn test_set_condition_keeps_transition_time_when_unchanged() {
        let mut conditions = vec![Condition {
            r#type: "Reconciled".into(),
            status: "True".into(),
            last_transition_time: Some("2024-01-01T00:00:00Z".into()),
            reason: Some("Success".into()),
            message: Some("ok".into()),
        }];
        set_condition(&mut conditions, Condition::new("Reconciled", true, "Success", "ok"));
        assert_eq!(conditions.len(), 1);
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );

        set_condition(&mut conditions, Condition::new("Reconciled", false, "Error", "boom"));
        assert_eq!(conditions[0].status, "False");
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_status_uses_uppercase_tls_field_names() {
        let status = ArgoCDStatus {
            repo_tls_checksum: Some("abc".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["repoTLSChecksum"], "abc");
        assert_eq!(value["applicationController"], "Unknown");
    }
}
