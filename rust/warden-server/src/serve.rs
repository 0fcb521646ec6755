use std::sync::Arc;

use anyhow::{Context, Result};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use warden_capability::{Authorizer, RemoteAuthorizer, ScopeAuthorizer};
use warden_credentials::{CredentialHandler, Rs256Handler};
use warden_gate::Gate;

use crate::{Config, WardenService, stack};

/// Build the gate described by `config`.
///
/// Keys are read here, so a missing or malformed signing key fails before
/// anything is bound.
///
/// # Errors
///
/// Fails if a key cannot be loaded or the policy client cannot be built.
pub fn gate(config: &Config) -> Result<Gate> {
    let keys = config.keys.load().context("failed to load key material")?;
    let handler: Arc<dyn CredentialHandler> = Arc::new(Rs256Handler::new(&keys));
    tracing::info!(
        key = %config.keys.private_key.display(),
        fallbacks = config.keys.fallback_keys.len(),
        "loaded key material"
    );

    let authorizer: Arc<dyn Authorizer> = match &config.authorizer_url {
        Some(url) => {
            tracing::info!(%url, "delegating authorization to policy service");
            Arc::new(
                RemoteAuthorizer::new(url.clone(), config.authorizer_timeout())
                    .context("failed to build policy client")?,
            )
        }
        None => {
            tracing::info!(rules = config.scope_rules.len(), "authorizing by token scope");
            Arc::new(ScopeAuthorizer::new(handler.clone()).with_rules(config.scope_rules.clone()))
        }
    };

    Ok(Gate::new(handler, authorizer)
        .with_endpoints(config.gated_endpoints())
        .with_timeout(config.authorization_timeout()))
}

/// Run the server until interrupted.
///
/// # Errors
///
/// Fails on configuration errors or if the listener cannot be bound.
pub async fn serve(config: Config) -> Result<()> {
    let gate = gate(&config)?;
    let service = stack::build(config.stack, gate);

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    run(listener, service, async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await;

    tracing::info!("shut down");
    Ok(())
}

/// Accept connections on `listener` until `shutdown` completes.
///
/// Connections already accepted keep running on their own tasks.
pub async fn run<F>(listener: TcpListener, service: WardenService<Incoming>, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok(accepted) => accepted,
                    Err(error) => {
                        tracing::warn!(%error, "failed to accept connection");
                        continue;
                    }
                };

                let service = TowerToHyperService::new(service.clone());
                tokio::spawn(async move {
                    if let Err(error) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        tracing::debug!(%peer, %error, "connection closed with error");
                    }
                });
            }
        }
    }
}
