//! # Webhook Server
//!
//! HTTPS listener for the validating admission webhook. Certificates are
//! read once at startup from the configured directory.

use super::validator::ArgoCDValidator;
use super::VALIDATE_ARGOCD_PATH;
use anyhow::{Context, Result};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::rustls;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info};

/// Build a rustls server configuration from PEM files
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<rustls::ServerConfig> {
    let cert_pem = tokio::fs::read(cert_path)
        .await
        .with_context(|| format!("Failed to read webhook certificate {}", cert_path.display()))?;
    let key_pem = tokio::fs::read(key_path)
        .await
        .with_context(|| format!("Failed to read webhook key {}", key_path.display()))?;
    tls_config_from_pem(&cert_pem, &key_pem)
}

pub fn tls_config_from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<rustls::ServerConfig> {
    let certs = rustls_pemfile::certs(&mut &cert_pem[..])
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid webhook certificate PEM")?;
    if certs.is_empty() {
        anyhow::bail!("No certificate found in webhook certificate PEM");
    }
    let key = rustls_pemfile::private_key(&mut &key_pem[..])
        .context("Invalid webhook key PEM")?
        .context("No private key found in webhook key PEM")?;
    let mut config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("Webhook certificate and key do not match")?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(config)
}

fn respond(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("content-type", content_type)
        .body(Full::new(body.into()))
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to build webhook response");
            Response::new(Full::new(Bytes::from_static(b"internal error")))
        })
}

/// Route one HTTP request
pub async fn handle(
    validator: &ArgoCDValidator,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() != Method::POST || req.uri().path() != VALIDATE_ARGOCD_PATH {
        return Ok(respond(StatusCode::NOT_FOUND, "text/plain", "not found"));
    }
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(error = %e, "Failed to read admission request body");
            return Ok(respond(StatusCode::BAD_REQUEST, "text/plain", "unreadable body"));
        }
    };
    Ok(respond_review(validator, &body))
}

/// Validate a review body and encode the reply
pub fn respond_review(validator: &ArgoCDValidator, body: &[u8]) -> Response<Full<Bytes>> {
    match serde_json::to_vec(&validator.review(body)) {
        Ok(json) => respond(StatusCode::OK, "application/json", json),
        Err(e) => {
            error!(error = %e, "Failed to encode AdmissionReview");
            respond(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", "encoding failed")
        }
    }
}

/// Accept TLS connections until the process exits
pub async fn start_webhook_server(port: u16, tls: rustls::ServerConfig) -> Result<()> {
    let acceptor = TlsAcceptor::from(Arc::new(tls));
    let validator = Arc::new(ArgoCDValidator::new());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind webhook listener on {addr}"))?;
    info!(addr = %addr, path = VALIDATE_ARGOCD_PATH, "Webhook server listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "Failed to accept webhook connection");
                continue;
            }
        };
        let acceptor = acceptor.clone();
        let validator = Arc::clone(&validator);
        tokio::spawn(async move {
            let tls_stream = match acceptor.accept(stream).await {
                Ok(s) => s,
                Err(e) => {
                    debug!(peer = %peer, error = %e, "TLS handshake failed");
                    return;
                }
            };
            let service = service_fn(move |req| {
                let validator = Arc::clone(&validator);
                async move { handle(&validator, req).await }
            });
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(tls_stream), service)
                .await
            {
                debug!(peer = %peer, error = %e, "Webhook connection error");
            }
        });
    }
}
