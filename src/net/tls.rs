//! TLS listener glue.
//!
//! Builds the rustls server configuration around the reloadable certificate
//! and serves a router over it until the lifecycle reaches Shutdown.

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::lifecycle::{LifecycleState, Runtime};
use crate::tls::ReloadableCert;

/// Grace period for in-flight requests once Shutdown is reached.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Server configuration that resolves the certificate on every handshake.
pub fn server_config(resolver: Arc<ReloadableCert>) -> Result<rustls::ServerConfig, rustls::Error> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_cert_resolver(resolver);
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(config)
}

/// Wrap the server configuration for axum-server.
pub fn load_tls_config(resolver: Arc<ReloadableCert>) -> Result<RustlsConfig, rustls::Error> {
    Ok(RustlsConfig::from_config(Arc::new(server_config(resolver)?)))
}

/// Serve `router` over TLS on `addr`, draining once the lifecycle reaches Shutdown.
pub async fn serve(
    addr: SocketAddr,
    router: Router,
    runtime: Runtime,
) -> Result<(), std::io::Error> {
    let tls =
        load_tls_config(Arc::clone(&runtime.certificate)).map_err(std::io::Error::other)?;

    let handle = Handle::new();
    let shutdown = handle.clone();
    let lifecycle = Arc::clone(&runtime.lifecycle);
    tokio::spawn(async move {
        lifecycle.wait_state(LifecycleState::Shutdown, None).await;
        tracing::info!("Draining TLS listener");
        shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    tracing::info!(address = %addr, "TLS listener starting");
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    tracing::info!("TLS listener stopped");
    Ok(())
}
