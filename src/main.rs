//! Reverse proxy trust layer (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                  TRUST LAYER                          │
//!                 │                                                       │
//!   ClientHello   │  ┌──────────┐    ┌────────────────┐                  │
//!   ──────────────┼─▶│ net::tls │───▶│ ReloadableCert │◀── SIGHUP        │
//!                 │  │ listener │    │   (arc-swap)   │◀── file watcher  │
//!                 │  └──────────┘    └───────┬────────┘◀── admin API     │
//!                 │                          │                            │
//!                 │                          ▼                            │
//!                 │                  ┌────────────────┐                  │
//!                 │                  │ health monitor │ every 24h        │
//!                 │                  │ verify+analyse │                  │
//!                 │                  └────────────────┘                  │
//!                 │                                                       │
//!                 │  lifecycle: Bootstrap ──▶ Daemon ──▶ Shutdown         │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use reverse_proxy_trust::admin::{self, AdminState};
use reverse_proxy_trust::config::loader::load_config;
use reverse_proxy_trust::config::watcher::{ConfigWatcher, ReloadEvent};
use reverse_proxy_trust::health::{MonitorMode, TlsHealthMonitor};
use reverse_proxy_trust::lifecycle::{self, signals, LifecycleState};
use reverse_proxy_trust::net;
use reverse_proxy_trust::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "reverse-proxy-trust")]
#[command(about = "TLS trust layer for the reverse proxy", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "proxy.toml")]
    config: PathBuf,

    /// Check the configured certificate chain once and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability);
    tracing::info!("reverse-proxy-trust v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        monitor_interval_secs = config.tls_monitor.interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let runtime = lifecycle::bootstrap(&config).await?;

    if cli.check {
        let monitor = TlsHealthMonitor::new(runtime.certificate.clone(), Duration::ZERO);
        let verified = monitor.run(MonitorMode::OneShot).await.is_some();
        tracing::info!(verified, "Certificate check finished");
        return if verified {
            Ok(())
        } else {
            Err("certificate chain did not verify".into())
        };
    }

    // Hot reload of config and certificate files
    let (watcher, mut reloads) = ConfigWatcher::new(&cli.config);
    let mut watches = watcher.with_tls_paths(&config).run()?;
    {
        let runtime = runtime.clone();
        tokio::spawn(async move {
            while let Some(event) = reloads.recv().await {
                let _ = match event {
                    ReloadEvent::Config(new_config) => {
                        if let Err(e) = watches.update_tls_paths(&new_config) {
                            tracing::error!(error = %e, "Failed to watch new TLS files");
                        }
                        runtime.apply_config(&new_config).await
                    }
                    ReloadEvent::TlsMaterial => runtime.reload_certificate().await,
                };
            }
        });
    }

    tokio::spawn(signals::listen(runtime.clone()));

    if config.admin.enabled {
        let addr: SocketAddr = config.admin.bind_address.parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let state = AdminState::new(runtime.clone(), &config.admin.api_key);
        let router = admin::setup_admin_router(state);
        tracing::info!(address = %addr, "Admin API listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "Admin API stopped");
            }
        });
    }

    runtime.spawn_tls_monitor();
    runtime.lifecycle.set_state(LifecycleState::Daemon);

    let addr: SocketAddr = config.listener.bind_address.parse()?;
    net::tls::serve(addr, admin::setup_health_router(runtime.clone()), runtime).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
