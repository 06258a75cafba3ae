//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Field manager used for every server-side apply
pub const FIELD_MANAGER: &str = "argocd-operator";

/// API group shared by all Argo CD custom resources
pub const ARGOPROJ_GROUP: &str = "argoproj.io";

/// Finalizer placed on ArgoCD and ClusterArgoCD resources
pub const ARGOCD_FINALIZER: &str = "argoproj.io/finalizer";

/// Finalizer placed on NamespaceManagement resources
pub const NAMESPACE_MANAGEMENT_FINALIZER: &str = "argoproj.io/namespace-management";

/// Annotation set by `argocdctl reconcile` to force a reconciliation
pub const RECONCILE_ANNOTATION: &str = "argocd.argoproj.io/reconcile";

/// Pod template annotation carrying the TLS secret checksum
pub const TLS_CHECKSUM_ANNOTATION: &str = "argocd.argoproj.io/tls-checksum";

/// Namespace label that hands a namespace to an Argo CD instance
pub const MANAGED_BY_LABEL: &str = "argocd.argoproj.io/managed-by";

pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";

pub const PART_OF_VALUE: &str = "argocd";
pub const MANAGED_BY_VALUE: &str = "argocd-operator";

/// Default Argo CD image and tag
pub const DEFAULT_ARGOCD_IMAGE: &str = "quay.io/argoproj/argocd";
pub const DEFAULT_ARGOCD_VERSION: &str = "v2.13.1";

pub const DEFAULT_REDIS_IMAGE: &str = "docker.io/library/redis";
pub const DEFAULT_REDIS_VERSION: &str = "7.0.15-alpine";

pub const DEFAULT_HAPROXY_IMAGE: &str = "docker.io/library/haproxy";
pub const DEFAULT_HAPROXY_VERSION: &str = "2.6.17-alpine";

pub const DEFAULT_DEX_IMAGE: &str = "ghcr.io/dexidp/dex";
pub const DEFAULT_DEX_VERSION: &str = "v2.41.1";

pub const DEFAULT_AGENT_IMAGE: &str = "quay.io/argoprojlabs/argocd-agent";
pub const DEFAULT_AGENT_VERSION: &str = "v0.1.0";

/// Well-known Argo CD configuration object names
pub const ARGOCD_CM: &str = "argocd-cm";
pub const ARGOCD_RBAC_CM: &str = "argocd-rbac-cm";
pub const ARGOCD_SSH_KNOWN_HOSTS_CM: &str = "argocd-ssh-known-hosts-cm";
pub const ARGOCD_TLS_CERTS_CM: &str = "argocd-tls-certs-cm";
pub const ARGOCD_GPG_KEYS_CM: &str = "argocd-gpg-keys-cm";
pub const ARGOCD_CMD_PARAMS_CM: &str = "argocd-cmd-params-cm";
pub const ARGOCD_NOTIFICATIONS_CM: &str = "argocd-notifications-cm";
pub const ARGOCD_SECRET: &str = "argocd-secret";
pub const ARGOCD_NOTIFICATIONS_SECRET: &str = "argocd-notifications-secret";
pub const ARGOCD_REPO_SERVER_TLS_SECRET: &str = "argocd-repo-server-tls";
pub const ARGOCD_REDIS_TLS_SECRET: &str = "argocd-operator-redis-tls";

/// OpenShift service CA: issues a serving certificate into the named secret
pub const SERVING_CERT_ANNOTATION: &str = "service.beta.openshift.io/serving-cert-secret-name";
/// `autotls` provider backed by the OpenShift service CA
pub const AUTOTLS_OPENSHIFT: &str = "openshift";

/// Component ports
pub const SERVER_HTTP_PORT: i32 = 8080;
pub const SERVER_METRICS_PORT: i32 = 8083;
pub const REPO_SERVER_PORT: i32 = 8081;
pub const REPO_SERVER_METRICS_PORT: i32 = 8084;
pub const CONTROLLER_METRICS_PORT: i32 = 8082;
pub const REDIS_PORT: i32 = 6379;
pub const DEX_HTTP_PORT: i32 = 5556;
pub const DEX_GRPC_PORT: i32 = 5557;
pub const APPSET_WEBHOOK_PORT: i32 = 7000;
pub const APPSET_METRICS_PORT: i32 = 8080;
pub const NOTIFICATIONS_METRICS_PORT: i32 = 9001;
pub const PRINCIPAL_GRPC_PORT: i32 = 8443;
pub const AGENT_METRICS_PORT: i32 = 8181;

/// Number of redis servers in HA mode
pub const REDIS_HA_REPLICAS: i32 = 3;

/// Default HTTP server port for metrics and health checks
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default HTTPS port for the validating webhook
pub const DEFAULT_WEBHOOK_PORT: u16 = 9443;

/// Default directory holding `tls.crt`/`tls.key` for the webhook
pub const DEFAULT_WEBHOOK_CERT_DIR: &str = "/tmp/k8s-webhook-server/serving-certs";

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Requeue interval after a successful reconciliation (seconds)
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;

/// Requeue interval while waiting on a missing dependency (seconds)
pub const DEFAULT_WAITING_REQUEUE_SECS: u64 = 60;

/// Fibonacci error backoff bounds (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default delay before restarting a controller stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default cap on concurrent reconciliations per controller
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;
