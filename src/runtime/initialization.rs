//! # Initialization
//!
//! Operator startup: rustls crypto provider, tracing, metrics, the health
//! server, the admission webhook and the Kubernetes client.

use crate::config::{create_shared_config, SharedControllerConfig, SharedServerConfig};
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::{ArgoCD, ClusterArgoCD, NamespaceManagement};
use crate::observability;
use crate::webhook;
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything the controllers need once startup has finished
pub struct InitializationResult {
    pub client: Client,
    pub reconciler: Arc<Reconciler>,
    /// Readiness flag shared with `/readyz`
    pub server_state: Arc<ServerState>,
    pub controller_config: SharedControllerConfig,
    pub server_config: SharedServerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .finish_non_exhaustive()
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise `log_level` applies to this crate.
pub fn init_tracing(log_level: &str, log_format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("argocd_operator={}", log_level.to_lowercase()).into()
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if log_format.eq_ignore_ascii_case("json") {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("Tracing subscriber already installed: {e}");
    }
}

pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before anything builds a rustls config
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    let (controller_config, server_config) = create_shared_config();
    let enable_metrics = {
        let config = controller_config.read().await;
        init_tracing(&config.log_level, &config.log_format);
        config.enable_metrics
    };

    info!("Starting Argo CD operator v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    if enable_metrics {
        observability::metrics::register_metrics().context("Failed to register metrics")?;
    }

    let server_state = Arc::new(ServerState::default());
    let (metrics_port, enable_webhook) = {
        let config = server_config.read().await;
        (config.metrics_port, config.enable_webhook)
    };
    let state = Arc::clone(&server_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(metrics_port, state).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    if enable_webhook {
        start_webhook(&server_config).await?;
    } else {
        info!("Validating webhook disabled (ENABLE_WEBHOOK=false)");
    }

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let reconciler = Arc::new(Reconciler::new(client.clone(), controller_config.clone()));

    report_existing_resources(&client).await;

    info!("Operator initialized, starting controllers...");
    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
        controller_config,
        server_config,
    })
}

async fn start_webhook(server_config: &SharedServerConfig) -> Result<()> {
    let (port, cert, key) = {
        let config = server_config.read().await;
        (
            config.webhook_port,
            config.webhook_cert_path(),
            config.webhook_key_path(),
        )
    };
    let tls = webhook::load_tls_config(&cert, &key).await?;
    tokio::spawn(async move {
        if let Err(e) = webhook::start_webhook_server(port, tls).await {
            error!("Webhook server error: {:#}", e);
        }
    });
    Ok(())
}

/// Wait for the HTTP server to bind before declaring startup done
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &SharedServerConfig,
) -> Result<()> {
    let (startup_timeout, poll_interval) = {
        let config = server_config.read().await;
        (config.startup_timeout(), config.poll_interval())
    };
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            anyhow::bail!("HTTP server failed to start");
        }
        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }
        if start_time.elapsed() > startup_timeout {
            anyhow::bail!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            );
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Log what already exists so operators can see the starting point
///
/// The controllers reconcile everything listed here on their first relist.
async fn report_existing_resources(client: &Client) {
    let argocds: Api<ArgoCD> = Api::all(client.clone());
    match argocds.list(&ListParams::default()).await {
        Ok(list) => {
            let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for item in &list.items {
                by_namespace
                    .entry(item.namespace().unwrap_or_default())
                    .or_default()
                    .push(item.name_any());
            }
            info!(
                total = list.items.len(),
                namespaces = by_namespace.len(),
                "Found existing ArgoCD resources"
            );
            for (namespace, names) in &by_namespace {
                info!(namespace = %namespace, "  {}", names.join(", "));
            }
        }
        Err(e) => {
            error!("ArgoCD CRD is not queryable: {}. Is the CRD installed?", e);
            warn!("Continuing; the controller will retry once the CRD exists");
        }
    }

    let clusters: Api<ClusterArgoCD> = Api::all(client.clone());
    if let Ok(list) = clusters.list(&ListParams::default()).await {
        info!(total = list.items.len(), "Found existing ClusterArgoCD resources");
    }
    let requests: Api<NamespaceManagement> = Api::all(client.clone());
    if let Ok(list) = requests.list(&ListParams::default()).await {
        info!(total = list.items.len(), "Found existing NamespaceManagement resources");
    }
}
