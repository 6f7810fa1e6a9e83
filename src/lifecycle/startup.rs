//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the lifecycle coordinator and the reloadable certificate
//! - Run the first certificate initialization (fatal on failure)
//! - Start the certificate health monitor once the Daemon phase is reached
//! - Apply certificate reloads from signals, watchers and the admin API
//!
//! # Design Decisions
//! - Fail fast: no certificate at boot means no listener
//! - A failed reload after boot is logged and the old certificate keeps serving

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::{ProxyConfig, TlsMonitorConfig};
use crate::health::certificate::{MonitorMode, TlsHealthMonitor};
use crate::lifecycle::state::{LifecycleState, StateCoordinator};
use crate::tls::{ReloadableCert, TlsError};

/// Error type for process startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("TLS certificate initialization failed: {0}")]
    Certificate(#[from] TlsError),
}

/// Shared handles to the trust layer, cloned into every task.
#[derive(Debug, Clone)]
pub struct Runtime {
    pub lifecycle: Arc<StateCoordinator>,
    pub certificate: Arc<ReloadableCert>,
    monitor: TlsMonitorConfig,
}

/// Build the runtime and activate the configured certificate.
pub async fn bootstrap(config: &ProxyConfig) -> Result<Runtime, StartupError> {
    let lifecycle = Arc::new(StateCoordinator::new());
    let certificate = Arc::new(ReloadableCert::new(config.listener.tls.clone()));

    certificate.trigger_init().await?;

    Ok(Runtime {
        lifecycle,
        certificate,
        monitor: config.tls_monitor.clone(),
    })
}

impl Runtime {
    /// Spawn the recurring certificate check, gated on the Daemon phase.
    pub fn spawn_tls_monitor(&self) -> Option<JoinHandle<()>> {
        if !self.monitor.enabled {
            tracing::info!("TLS certificate monitor disabled");
            return None;
        }

        let monitor = TlsHealthMonitor::new(
            Arc::clone(&self.certificate),
            Duration::from_secs(self.monitor.interval_secs),
        );
        let lifecycle = Arc::clone(&self.lifecycle);
        Some(tokio::spawn(async move {
            lifecycle.wait_state(LifecycleState::Daemon, None).await;
            monitor.run(MonitorMode::Continuous).await;
        }))
    }

    /// Re-run certificate initialization, keeping the old one on failure.
    pub async fn reload_certificate(&self) -> Result<(), TlsError> {
        match self.certificate.trigger_init().await {
            Ok(()) => Ok(()),
            Err(e) => {
                let serving = self
                    .certificate
                    .active()
                    .map(|active| active.serial().to_string())
                    .unwrap_or_else(|| "none".to_string());
                tracing::error!(
                    error = %e,
                    serving = %serving,
                    "TLS certificate reload failed, keeping current certificate"
                );
                Err(e)
            }
        }
    }

    /// Apply a reloaded configuration; reloads the certificate if its settings changed.
    pub async fn apply_config(&self, config: &ProxyConfig) -> Result<(), TlsError> {
        if !self.certificate_settings_changed(config) {
            tracing::debug!("TLS settings unchanged");
            return Ok(());
        }
        self.certificate.update_settings(config.listener.tls.clone());
        self.reload_certificate().await
    }

    fn certificate_settings_changed(&self, config: &ProxyConfig) -> bool {
        self.certificate.settings().as_deref() != config.listener.tls.as_ref()
    }
}
