//! # CRD Validation Tests
//!
//! Sample manifests for every custom resource, deserialized the way the API
//! server would hand them to the operator, plus checks on the generated CRDs.

use argocd_operator::crd::{
    ArgoCD, ClusterArgoCD, InstancePhase, NamespaceManagement, SSOProviderType,
};
use kube::core::CustomResourceExt;

#[test]
fn test_full_argocd_manifest() {
    let yaml = r#"
apiVersion: argoproj.io/v1beta1
kind: ArgoCD
metadata:
  name: example
  namespace: argocd
spec:
  version: v2.13.1
  controller:
    sharding:
      enabled: true
      replicas: 3
  server:
    insecure: true
    host: argocd.example.com
    ingress:
      enabled: true
      ingressClassName: nginx
  ha:
    enabled: true
  sso:
    provider: dex
    dex:
      openShiftOAuth: true
  sourceNamespaces:
    - team-a
    - "team-*"
  namespaceManagement:
    - name: "dev-*"
      allowManagedBy: true
  extraConfig:
    timeout.reconciliation: 300s
  statusBadgeEnabled: true
"#;

    let argocd: ArgoCD = serde_yaml::from_str(yaml).expect("Should deserialize full ArgoCD");
    let spec = &argocd.spec;
    assert_eq!(spec.version.as_deref(), Some("v2.13.1"));
    assert!(spec.controller.sharding.enabled);
    assert_eq!(spec.controller.sharding.replicas, Some(3));
    assert!(spec.server.insecure);
    assert_eq!(spec.server.host.as_deref(), Some("argocd.example.com"));
    assert!(spec.server.ingress.enabled);
    assert!(spec.ha.enabled);
    let sso = spec.sso_spec();
    assert_eq!(sso.provider, Some(SSOProviderType::Dex));
    assert!(sso.dex.is_some_and(|d| d.open_shift_oauth));
    assert_eq!(spec.source_namespaces, vec!["team-a", "team-*"]);
    assert_eq!(spec.namespace_management.len(), 1);
    assert!(spec.namespace_management[0].allow_managed_by);
    assert_eq!(
        spec.extra_config.get("timeout.reconciliation").map(String::as_str),
        Some("300s")
    );
    assert!(spec.status_badge_enabled);
}

#[test]
fn test_minimal_argocd_uses_defaults() {
    let yaml = r"
apiVersion: argoproj.io/v1beta1
kind: ArgoCD
metadata:
  name: minimal
  namespace: argocd
spec: {}
";

    let argocd: ArgoCD = serde_yaml::from_str(yaml).expect("Should deserialize empty spec");
    let spec = &argocd.spec;
    assert!(spec.controller.enabled);
    assert!(spec.server.enabled);
    assert!(spec.application_set_enabled());
    assert!(spec.repo_enabled());
    assert!(spec.redis_enabled());
    assert!(spec.sso.is_none());
    assert!(spec.source_namespaces.is_empty());
    assert!(argocd.status.is_none());
}

#[test]
fn test_argocd_status_round_trips_component_phases() {
    let yaml = r"
apiVersion: argoproj.io/v1beta1
kind: ArgoCD
metadata:
  name: example
  namespace: argocd
spec: {}
status:
  phase: Available
  applicationController: Running
  server: Running
  repo: Running
  redis: Running
  sso: Unknown
  host: example-server.argocd.svc.cluster.local
  conditions:
    - type: Reconciled
      status: 'True'
      reason: Success
";

    let argocd: ArgoCD = serde_yaml::from_str(yaml).expect("Should deserialize status");
    let status = argocd.status.expect("status present");
    assert_eq!(status.phase, InstancePhase::Available);
    assert_eq!(status.server.to_string(), "Running");
    assert_eq!(status.sso.to_string(), "Unknown");
    assert_eq!(status.conditions.len(), 1);
    assert_eq!(status.conditions[0].reason.as_deref(), Some("Success"));
}

#[test]
fn test_cluster_argocd_flattens_instance_spec() {
    let yaml = r"
apiVersion: argoproj.io/v1alpha1
kind: ClusterArgoCD
metadata:
  name: shared
spec:
  targetNamespace: argocd-shared
  server:
    insecure: true
  sourceNamespaces:
    - apps
";

    let cluster: ClusterArgoCD =
        serde_yaml::from_str(yaml).expect("Should deserialize ClusterArgoCD");
    assert_eq!(cluster.spec.target_namespace, "argocd-shared");
    assert!(cluster.spec.argocd.server.insecure);
    assert_eq!(cluster.spec.argocd.source_namespaces, vec!["apps"]);
}

#[test]
fn test_namespace_management_manifest() {
    let yaml = r"
apiVersion: argoproj.io/v1beta1
kind: NamespaceManagement
metadata:
  name: request
  namespace: dev-team
spec:
  managedBy: argocd
";

    let request: NamespaceManagement =
        serde_yaml::from_str(yaml).expect("Should deserialize NamespaceManagement");
    assert_eq!(request.spec.managed_by, "argocd");
}

#[test]
fn test_namespace_management_requires_managed_by() {
    let yaml = r"
apiVersion: argoproj.io/v1beta1
kind: NamespaceManagement
metadata:
  name: request
  namespace: dev-team
spec: {}
";

    assert!(serde_yaml::from_str::<NamespaceManagement>(yaml).is_err());
}

#[test]
fn test_generated_crds_have_expected_scope_and_names() {
    let argocd = ArgoCD::crd();
    assert_eq!(argocd.spec.group, "argoproj.io");
    assert_eq!(argocd.spec.scope, "Namespaced");
    assert_eq!(argocd.spec.names.plural, "argocds");
    assert!(argocd.spec.versions[0].subresources.is_some());

    let cluster = ClusterArgoCD::crd();
    assert_eq!(cluster.spec.scope, "Cluster");
    assert_eq!(cluster.spec.versions[0].name, "v1alpha1");

    let request = NamespaceManagement::crd();
    assert_eq!(request.spec.scope, "Namespaced");
    assert_eq!(request.spec.names.kind, "NamespaceManagement");
}

#[test]
fn test_generated_crds_serialize_to_yaml() {
    for crd in [ArgoCD::crd(), ClusterArgoCD::crd(), NamespaceManagement::crd()] {
        let yaml = serde_yaml::to_string(&crd).expect("CRD should serialize");
        assert!(yaml.contains("kind: CustomResourceDefinition"));
        assert!(yaml.contains("openAPIV3Schema"));
    }
}
