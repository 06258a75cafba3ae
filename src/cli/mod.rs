//! # argocdctl
//!
//! Command-line interface for the Argo CD operator.
//!
//! ## Usage
//!
//! ```bash
//! # List ArgoCD instances in every namespace
//! argocdctl list argocd
//!
//! # Show the component phases of one instance
//! argocdctl status argocd example --namespace argocd
//!
//! # Force a reconciliation
//! argocdctl reconcile argocd example --namespace argocd
//!
//! # Cluster-scoped installations
//! argocdctl status clusterargocd shared
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

mod list;
mod reconcile;
mod status;

/// Argo CD operator CLI
#[derive(Parser)]
#[command(name = "argocdctl")]
#[command(
    about = "Argo CD operator CLI",
    long_about = None,
    after_help = "\
Available resource types:
  argocd                       - ArgoCD resource
  clusterargocd (or 'cargocd') - ClusterArgoCD resource
  namespacemanagement (or 'nsm') - NamespaceManagement resource

Examples:
  argocdctl list argocd
  argocdctl status argocd example --namespace argocd
  argocdctl reconcile cargocd shared
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to the current context namespace)
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Kubernetes context to use
    #[arg(short, long, global = true)]
    context: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List resources of a kind
    List {
        #[arg(value_enum, value_name = "RESOURCE_TYPE")]
        resource_type: ResourceType,
    },
    /// Show the status of a resource
    Status {
        #[arg(value_enum, value_name = "RESOURCE_TYPE")]
        resource_type: ResourceType,
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Trigger reconciliation by setting the reconcile annotation
    Reconcile {
        #[arg(value_enum, value_name = "RESOURCE_TYPE")]
        resource_type: ResourceType,
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ResourceType {
    #[value(name = "argocd")]
    ArgoCD,
    #[value(name = "clusterargocd", alias = "cargocd")]
    ClusterArgoCD,
    #[value(name = "namespacemanagement", alias = "nsm")]
    NamespaceManagement,
}

async fn client(context: Option<String>) -> Result<(Client, String)> {
    let options = KubeConfigOptions {
        context,
        ..Default::default()
    };
    let config = match Kubeconfig::read() {
        Ok(kubeconfig) => Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .context("Failed to load kubeconfig context")?,
        Err(_) => Config::infer()
            .await
            .context("No kubeconfig found and not running in a cluster")?,
    };
    let default_namespace = config.default_namespace.clone();
    let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
    Ok((client, default_namespace))
}

#[tokio::main]
async fn main() -> Result<()> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "argocdctl=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let (client, default_namespace) = client(cli.context).await?;

    match cli.command {
        Commands::List { resource_type } => {
            list::list_command(client, resource_type, cli.namespace).await
        }
        Commands::Status {
            resource_type,
            name,
        } => {
            let ns = cli.namespace.unwrap_or(default_namespace);
            status::status_command(client, resource_type, &name, &ns).await
        }
        Commands::Reconcile {
            resource_type,
            name,
        } => {
            let ns = cli.namespace.unwrap_or(default_namespace);
            reconcile::reconcile_command(client, resource_type, &name, &ns).await
        }
    }
}
