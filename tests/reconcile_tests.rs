//! Reconciler tests against a mocked Kubernetes API server.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use argocd_operator::config::ControllerConfig;
use argocd_operator::constants::{
    ARGOCD_FINALIZER, MANAGED_BY_LABEL, NAMESPACE_MANAGEMENT_FINALIZER, RECONCILE_ANNOTATION,
    TLS_CHECKSUM_ANNOTATION,
};
use argocd_operator::controller::reconciler::{
    reconcile_argocd, reconcile_cluster_argocd, reconcile_namespace_management, OperatorError,
    Reconciler,
};
use argocd_operator::crd::{
    ArgoCD, ArgoCDSpec, ArgoCDStatus, ClusterArgoCD, ClusterArgoCDSpec, ManagedNamespaceSpec,
    NamespaceManagement, NamespaceManagementSpec,
};
use argocd_operator::resources::secrets::data_checksum;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::config::{
    AuthInfo, Cluster, Context as KubeContext, KubeConfigOptions, Kubeconfig, NamedAuthInfo,
    NamedCluster, NamedContext,
};
use kube::runtime::controller::Action;
use serde_json::json;
use tokio::sync::RwLock;
use wiremock::matchers::{body_partial_json, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

async fn mock_client(server_uri: &str) -> kube::Client {
    let kubeconfig = Kubeconfig {
        clusters: vec![NamedCluster {
            name: "test".into(),
            cluster: Some(Cluster {
                server: Some(server_uri.to_string()),
                insecure_skip_tls_verify: Some(true),
                ..Default::default()
            }),
        }],
        contexts: vec![NamedContext {
            name: "test".into(),
            context: Some(KubeContext {
                cluster: "test".into(),
                user: Some("test".into()),
                namespace: Some("argocd".into()),
                ..Default::default()
            }),
        }],
        auth_infos: vec![NamedAuthInfo {
            name: "test".into(),
            auth_info: Some(AuthInfo::default()),
        }],
        current_context: Some("test".into()),
        ..Default::default()
    };

    let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .unwrap();
    kube::Client::try_from(config).unwrap()
}

fn test_context(client: kube::Client) -> Arc<Reconciler> {
    Arc::new(Reconciler::new(
        client,
        Arc::new(RwLock::new(ControllerConfig::default())),
    ))
}

/// Answers server-side apply with the object that was sent
struct EchoApply;

impl Respond for EchoApply {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(request.body.clone(), "application/json")
    }
}

/// Records the body of the status patch and answers with `reply`
struct CaptureStatus {
    seen: Arc<Mutex<Option<serde_json::Value>>>,
    reply: serde_json::Value,
}

impl Respond for CaptureStatus {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        if let Ok(body) = serde_json::from_slice(&request.body) {
            *self.seen.lock().unwrap() = Some(body);
        }
        ResponseTemplate::new(200).set_body_json(self.reply.clone())
    }
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "apiVersion": "v1",
        "kind": "Status",
        "metadata": {},
        "status": "Failure",
        "message": "not found",
        "reason": "NotFound",
        "code": 404
    }))
}

fn opted_in_argocd() -> serde_json::Value {
    json!({
        "apiVersion": "argoproj.io/v1beta1",
        "kind": "ArgoCD",
        "metadata": {
            "name": "example",
            "namespace": "argocd",
            "uid": "argocd-uid-1",
            "resourceVersion": "10"
        },
        "spec": {
            "namespaceManagement": [{ "name": "team-*", "allowManagedBy": true }]
        }
    })
}

fn argocd_list(items: Vec<serde_json::Value>) -> serde_json::Value {
    json!({
        "apiVersion": "argoproj.io/v1beta1",
        "kind": "ArgoCDList",
        "metadata": {},
        "items": items
    })
}

fn namespace_response(name: &str, labels: serde_json::Value) -> serde_json::Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": { "name": name, "uid": "ns-uid-1", "labels": labels }
    })
}

fn namespace_management_response() -> serde_json::Value {
    json!({
        "apiVersion": "argoproj.io/v1beta1",
        "kind": "NamespaceManagement",
        "metadata": {
            "name": "request",
            "namespace": "team-a",
            "uid": "nm-uid-1",
            "resourceVersion": "20"
        },
        "spec": { "managedBy": "argocd" }
    })
}

fn make_request(finalizing: bool) -> NamespaceManagement {
    let mut request = NamespaceManagement::new(
        "request",
        NamespaceManagementSpec {
            managed_by: "argocd".into(),
        },
    );
    request.metadata.namespace = Some("team-a".into());
    request.metadata.uid = Some("nm-uid-1".into());
    request.metadata.resource_version = Some("20".into());
    request.metadata.generation = Some(1);
    request.metadata.finalizers = Some(vec![NAMESPACE_MANAGEMENT_FINALIZER.to_string()]);
    if finalizing {
        request.metadata.deletion_timestamp =
            Some(serde_json::from_value(json!("2026-01-01T00:00:00Z")).unwrap());
    }
    request
}

fn argocd_response() -> serde_json::Value {
    json!({
        "apiVersion": "argoproj.io/v1beta1",
        "kind": "ArgoCD",
        "metadata": {
            "name": "example",
            "namespace": "argocd",
            "uid": "argocd-uid-1",
            "resourceVersion": "11"
        },
        "spec": {}
    })
}

fn make_argocd() -> ArgoCD {
    let mut argocd = ArgoCD::new("example", ArgoCDSpec::default());
    argocd.metadata.namespace = Some("argocd".into());
    argocd.metadata.uid = Some("argocd-uid-1".into());
    argocd.metadata.resource_version = Some("10".into());
    argocd.metadata.generation = Some(1);
    argocd.metadata.finalizers = Some(vec![ARGOCD_FINALIZER.to_string()]);
    argocd
}

/// Answer everything an install reconcile touches: lookups miss, applies
/// echo back, and nothing is managed yet. Specific mocks mounted with the
/// default priority win over these.
async fn mount_empty_cluster(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apiVersion": "v1",
            "kind": "NamespaceList",
            "metadata": {},
            "items": []
        })))
        .named("list-namespaces")
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/apis/rbac.authorization.k8s.io/v1/roles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "RoleList",
            "metadata": {},
            "items": []
        })))
        .named("list-roles")
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .respond_with(not_found())
        .named("get-missing")
        .with_priority(10)
        .mount(server)
        .await;

    Mock::given(method("PATCH"))
        .respond_with(EchoApply)
        .named("apply")
        .with_priority(10)
        .mount(server)
        .await;

    // nothing exists, so nothing may be deleted
    Mock::given(method("DELETE"))
        .respond_with(not_found())
        .named("delete")
        .expect(0)
        .with_priority(10)
        .mount(server)
        .await;
}

async fn capture_argocd_status(
    server: &MockServer,
    expected_calls: u64,
) -> Arc<Mutex<Option<serde_json::Value>>> {
    let seen = Arc::new(Mutex::new(None));
    Mock::given(method("PATCH"))
        .and(path(
            "/apis/argoproj.io/v1beta1/namespaces/argocd/argocds/example/status",
        ))
        .respond_with(CaptureStatus {
            seen: Arc::clone(&seen),
            reply: argocd_response(),
        })
        .named("patch-status")
        .expect(expected_calls)
        .mount(server)
        .await;
    seen
}

fn captured(seen: &Arc<Mutex<Option<serde_json::Value>>>) -> serde_json::Value {
    seen.lock()
        .unwrap()
        .clone()
        .expect("status patch should have been sent")
}

async fn mount_argocd_list(server: &MockServer, items: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path("/apis/argoproj.io/v1beta1/namespaces/argocd/argocds"))
        .respond_with(ResponseTemplate::new(200).set_body_json(argocd_list(items)))
        .named("list-argocds")
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_namespace_management_grants_access() {
    let server = MockServer::start().await;
    let ctx = test_context(mock_client(&server.uri()).await);

    mount_argocd_list(&server, vec![opted_in_argocd()]).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/team-a"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(namespace_response("team-a", json!({}))),
        )
        .named("get-namespace")
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/v1/namespaces/team-a"))
        .and(body_partial_json(json!({
            "metadata": { "labels": { MANAGED_BY_LABEL: "argocd" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(namespace_response(
            "team-a",
            json!({ MANAGED_BY_LABEL: "argocd" }),
        )))
        .named("label-namespace")
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(
            r"^/apis/rbac.authorization.k8s.io/v1/namespaces/team-a/(roles|rolebindings)/.*$",
        ))
        .respond_with(not_found())
        .named("get-rbac")
        .mount(&server)
        .await;

    // application controller and server each get a Role and a RoleBinding
    Mock::given(method("PATCH"))
        .and(path_regex(
            r"^/apis/rbac.authorization.k8s.io/v1/namespaces/team-a/(roles|rolebindings)/.*$",
        ))
        .respond_with(EchoApply)
        .named("apply-rbac")
        .expect(4)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(
            "/apis/argoproj.io/v1beta1/namespaces/team-a/namespacemanagements/request/status",
        ))
        .and(body_partial_json(json!({
            "status": { "conditions": [{ "type": "Ready", "status": "True", "reason": "Managed" }] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(namespace_management_response()))
        .named("patch-status")
        .expect(1)
        .mount(&server)
        .await;

    let result = reconcile_namespace_management(Arc::new(make_request(false)), ctx).await;

    let action = result.expect("reconcile should succeed");
    assert_eq!(
        action,
        Action::requeue(ControllerConfig::default().reconcile_interval())
    );
}

#[tokio::test]
async fn test_namespace_management_waits_for_missing_instance() {
    let server = MockServer::start().await;
    let ctx = test_context(mock_client(&server.uri()).await);

    mount_argocd_list(&server, vec![]).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/team-a"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(namespace_response("team-a", json!({}))),
        )
        .named("get-namespace")
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(
            "/apis/argoproj.io/v1beta1/namespaces/team-a/namespacemanagements/request/status",
        ))
        .and(body_partial_json(json!({
            "status": { "conditions": [{ "type": "Ready", "status": "False", "reason": "ArgoCDNotFound" }] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(namespace_management_response()))
        .named("patch-status")
        .expect(1)
        .mount(&server)
        .await;

    let action = reconcile_namespace_management(Arc::new(make_request(false)), ctx)
        .await
        .expect("reconcile should succeed");
    assert_eq!(
        action,
        Action::requeue(ControllerConfig::default().waiting_requeue())
    );
}

#[tokio::test]
async fn test_namespace_management_deletion_releases_namespace() {
    let server = MockServer::start().await;
    let ctx = test_context(mock_client(&server.uri()).await);

    mount_argocd_list(&server, vec![opted_in_argocd()]).await;

    // nothing left to revoke
    Mock::given(method("GET"))
        .and(path_regex(
            r"^/apis/rbac.authorization.k8s.io/v1/namespaces/team-a/(roles|rolebindings)/.*$",
        ))
        .respond_with(not_found())
        .named("get-rbac")
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/team-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(namespace_response(
            "team-a",
            json!({ MANAGED_BY_LABEL: "argocd" }),
        )))
        .named("get-namespace")
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/v1/namespaces/team-a"))
        .and(body_partial_json(json!({
            "metadata": { "labels": { MANAGED_BY_LABEL: null } }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(namespace_response("team-a", json!({}))),
        )
        .named("unlabel-namespace")
        .expect(1)
        .mount(&server)
        .await;

    // finalizer removal
    Mock::given(method("PATCH"))
        .and(path(
            "/apis/argoproj.io/v1beta1/namespaces/team-a/namespacemanagements/request",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(namespace_management_response()))
        .named("remove-finalizer")
        .expect(1)
        .mount(&server)
        .await;

    let action = reconcile_namespace_management(Arc::new(make_request(true)), ctx)
        .await
        .expect("cleanup should succeed");
    assert_eq!(action, Action::await_change());
}

#[tokio::test]
async fn test_invalid_argocd_records_failure_in_status() {
    let server = MockServer::start().await;
    let ctx = test_context(mock_client(&server.uri()).await);

    let mut spec = ArgoCDSpec::default();
    spec.controller.sharding.enabled = true;
    spec.controller.sharding.dynamic_scaling_enabled = Some(true);
    spec.namespace_management = vec![ManagedNamespaceSpec {
        name: "team-*".into(),
        allow_managed_by: true,
    }];
    let mut argocd = ArgoCD::new("example", spec);
    argocd.metadata.namespace = Some("argocd".into());
    argocd.metadata.uid = Some("argocd-uid-1".into());
    argocd.metadata.resource_version = Some("10".into());
    argocd.metadata.generation = Some(2);
    argocd.metadata.finalizers = Some(vec![ARGOCD_FINALIZER.to_string()]);

    Mock::given(method("PATCH"))
        .and(path(
            "/apis/argoproj.io/v1beta1/namespaces/argocd/argocds/example/status",
        ))
        .and(body_partial_json(json!({
            "status": {
                "phase": "Failed",
                "observedGeneration": 2,
                "conditions": [{ "status": "False", "reason": "ValidationFailed" }]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(opted_in_argocd()))
        .named("patch-status")
        .expect(1)
        .mount(&server)
        .await;

    let err = reconcile_argocd(Arc::new(argocd), ctx)
        .await
        .expect_err("conflicting sharding settings must fail");
    assert!(matches!(err, OperatorError::Finalizer(_)));
    assert!(err.to_string().contains("mutually exclusive"));
}

#[tokio::test]
async fn test_argocd_reconcile_reports_status() {
    let server = MockServer::start().await;
    let ctx = test_context(mock_client(&server.uri()).await);
    mount_empty_cluster(&server).await;
    let seen = capture_argocd_status(&server, 1).await;

    Mock::given(method("PATCH"))
        .and(path("/apis/apps/v1/namespaces/argocd/statefulsets/example-application-controller"))
        .respond_with(EchoApply)
        .named("apply-controller")
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/v1/namespaces/argocd/secrets/argocd-secret"))
        .respond_with(EchoApply)
        .named("apply-argocd-secret")
        .expect(1)
        .mount(&server)
        .await;

    let action = reconcile_argocd(Arc::new(make_argocd()), ctx)
        .await
        .expect("reconcile should succeed");
    assert_eq!(
        action,
        Action::requeue(ControllerConfig::default().reconcile_interval())
    );

    let body = captured(&seen);
    let status = &body["status"];
    // freshly applied workloads report no ready replicas yet
    assert_eq!(status["phase"], "Pending");
    assert_eq!(status["applicationController"], "Pending");
    assert_eq!(status["server"], "Pending");
    assert_eq!(status["host"], "example-server.argocd.svc.cluster.local");
    assert_eq!(status["observedGeneration"], 1);
    assert_eq!(status["conditions"][0]["type"], "Reconciled");
    assert_eq!(status["conditions"][0]["status"], "True");
    assert!(status.get("repoTLSChecksum").is_none());
}

#[tokio::test]
async fn test_argocd_unchanged_status_is_not_patched() {
    let first = MockServer::start().await;
    mount_empty_cluster(&first).await;
    let seen = capture_argocd_status(&first, 1).await;
    reconcile_argocd(
        Arc::new(make_argocd()),
        test_context(mock_client(&first.uri()).await),
    )
    .await
    .expect("first reconcile should succeed");
    let status: ArgoCDStatus =
        serde_json::from_value(captured(&seen)["status"].clone()).unwrap();

    let second = MockServer::start().await;
    mount_empty_cluster(&second).await;
    capture_argocd_status(&second, 0).await;
    let mut argocd = make_argocd();
    argocd.status = Some(status);
    let action = reconcile_argocd(
        Arc::new(argocd),
        test_context(mock_client(&second.uri()).await),
    )
    .await
    .expect("second reconcile should succeed");
    assert_eq!(
        action,
        Action::requeue(ControllerConfig::default().reconcile_interval())
    );
}

#[tokio::test]
async fn test_argocd_manual_trigger_is_cleared() {
    let server = MockServer::start().await;
    let ctx = test_context(mock_client(&server.uri()).await);
    mount_empty_cluster(&server).await;
    capture_argocd_status(&server, 1).await;

    Mock::given(method("PATCH"))
        .and(path("/apis/argoproj.io/v1beta1/namespaces/argocd/argocds/example"))
        .and(body_partial_json(json!({
            "metadata": { "annotations": { RECONCILE_ANNOTATION: null } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(argocd_response()))
        .named("clear-trigger")
        .expect(1)
        .mount(&server)
        .await;

    let mut argocd = make_argocd();
    argocd.metadata.annotations = Some(BTreeMap::from([(
        RECONCILE_ANNOTATION.to_string(),
        "2026-10-18T10:00:00Z".to_string(),
    )]));
    reconcile_argocd(Arc::new(argocd), ctx)
        .await
        .expect("reconcile should succeed");
}

#[tokio::test]
async fn test_cluster_argocd_deploys_into_target_namespace() {
    let server = MockServer::start().await;
    let ctx = test_context(mock_client(&server.uri()).await);
    mount_empty_cluster(&server).await;

    Mock::given(method("PATCH"))
        .and(path(
            "/apis/apps/v1/namespaces/argocd-shared/statefulsets/shared-application-controller",
        ))
        .respond_with(EchoApply)
        .named("apply-controller")
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(
            "/apis/rbac.authorization.k8s.io/v1/clusterroles/argocd-shared-shared-application-controller",
        ))
        .respond_with(EchoApply)
        .named("apply-cluster-role")
        .expect(1)
        .mount(&server)
        .await;

    let seen = Arc::new(Mutex::new(None));
    Mock::given(method("PATCH"))
        .and(path("/apis/argoproj.io/v1alpha1/clusterargocds/shared/status"))
        .respond_with(CaptureStatus {
            seen: Arc::clone(&seen),
            reply: json!({
                "apiVersion": "argoproj.io/v1alpha1",
                "kind": "ClusterArgoCD",
                "metadata": { "name": "shared", "uid": "cluster-uid-1", "resourceVersion": "31" },
                "spec": { "targetNamespace": "argocd-shared" }
            }),
        })
        .named("patch-status")
        .expect(1)
        .mount(&server)
        .await;

    let mut cluster = ClusterArgoCD::new(
        "shared",
        ClusterArgoCDSpec {
            target_namespace: "argocd-shared".into(),
            argocd: ArgoCDSpec::default(),
        },
    );
    cluster.metadata.uid = Some("cluster-uid-1".into());
    cluster.metadata.resource_version = Some("30".into());
    cluster.metadata.generation = Some(1);
    cluster.metadata.finalizers = Some(vec![ARGOCD_FINALIZER.to_string()]);

    let action = reconcile_cluster_argocd(Arc::new(cluster), ctx)
        .await
        .expect("reconcile should succeed");
    assert_eq!(
        action,
        Action::requeue(ControllerConfig::default().reconcile_interval())
    );
    let body = captured(&seen);
    assert_eq!(
        body["status"]["host"],
        "shared-server.argocd-shared.svc.cluster.local"
    );
}

#[tokio::test]
async fn test_tls_secret_checksum_rolls_repo_server() {
    let server = MockServer::start().await;
    let ctx = test_context(mock_client(&server.uri()).await);
    mount_empty_cluster(&server).await;
    let seen = capture_argocd_status(&server, 1).await;

    let tls = Secret {
        data: Some(BTreeMap::from([
            ("tls.crt".to_string(), ByteString(b"cert".to_vec())),
            ("tls.key".to_string(), ByteString(b"key".to_vec())),
        ])),
        ..Default::default()
    };
    let checksum = data_checksum(&tls).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/argocd/secrets/argocd-repo-server-tls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": { "name": "argocd-repo-server-tls", "namespace": "argocd" },
            "data": { "tls.crt": "Y2VydA==", "tls.key": "a2V5" }
        })))
        .named("get-repo-tls")
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/apis/apps/v1/namespaces/argocd/deployments/example-repo-server"))
        .and(body_partial_json(json!({
            "spec": { "template": { "metadata": { "annotations": {
                TLS_CHECKSUM_ANNOTATION: checksum.clone()
            } } } }
        })))
        .respond_with(EchoApply)
        .named("apply-repo-server")
        .expect(1)
        .mount(&server)
        .await;

    // the redis secret went away since the last pass
    let mut argocd = make_argocd();
    argocd.status = Some(ArgoCDStatus {
        redis_tls_checksum: Some("stale".into()),
        ..Default::default()
    });

    reconcile_argocd(Arc::new(argocd), ctx)
        .await
        .expect("reconcile should succeed");

    let body = captured(&seen);
    let status = body["status"].as_object().unwrap();
    assert_eq!(status["repoTLSChecksum"], checksum.as_str());
    assert_eq!(checksum.len(), 64);
    assert!(status.contains_key("redisTLSChecksum"));
    assert!(status["redisTLSChecksum"].is_null());
}

#[tokio::test]
async fn test_namespace_management_manual_trigger_is_cleared() {
    let server = MockServer::start().await;
    let ctx = test_context(mock_client(&server.uri()).await);

    mount_argocd_list(&server, vec![]).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/team-a"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(namespace_response("team-a", json!({}))),
        )
        .named("get-namespace")
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(
            "/apis/argoproj.io/v1beta1/namespaces/team-a/namespacemanagements/request/status",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(namespace_management_response()))
        .named("patch-status")
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(
            "/apis/argoproj.io/v1beta1/namespaces/team-a/namespacemanagements/request",
        ))
        .and(body_partial_json(json!({
            "metadata": { "annotations": { RECONCILE_ANNOTATION: null } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(namespace_management_response()))
        .named("clear-trigger")
        .expect(1)
        .mount(&server)
        .await;

    let mut request = make_request(false);
    request.metadata.annotations = Some(BTreeMap::from([(
        RECONCILE_ANNOTATION.to_string(),
        "2026-10-18T10:00:00Z".to_string(),
    )]));
    reconcile_namespace_management(Arc::new(request), ctx)
        .await
        .expect("reconcile should succeed");
}
